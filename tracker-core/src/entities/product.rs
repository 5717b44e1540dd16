use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Identified;
use crate::value_objects::ProductId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product: String,
    pub threshold_temperature: Decimal,
    pub density: Decimal,
}

impl Identified for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

/// Product payload before the server assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub product: String,
    pub threshold_temperature: Decimal,
    pub density: Decimal,
}

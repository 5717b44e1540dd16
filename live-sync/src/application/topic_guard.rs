use std::sync::Arc;

use super::push_channel::PushChannel;
use super::registry::{MessageHandler, SubscribeOutcome};
use crate::domain::Topic;

/// Topic subscription released when the guard is dropped
pub struct TopicGuard {
    channel: Arc<PushChannel>,
    topic: Topic,
}

impl TopicGuard {
    pub fn open(channel: &Arc<PushChannel>, topic: Topic, handler: MessageHandler) -> Self {
        let outcome = channel.subscribe(topic.clone(), handler);
        tracing::debug!(topic = %topic, bound = outcome == SubscribeOutcome::Bound, "topic opened");
        TopicGuard {
            channel: Arc::clone(channel),
            topic,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl Drop for TopicGuard {
    fn drop(&mut self) {
        self.channel.unsubscribe(&self.topic);
    }
}

// Queue module: downstream message stream and the retrying publisher

pub mod nats;
pub mod publisher;

pub use nats::NatsClient;
pub use publisher::{
    EventPublisher, MessageSink, NatsMessageSink, OutboundMessage, PublishOutcome, EVENT_ID_HEADER,
};

mod broker;
mod coordinator;

pub use broker::{Broker, BrokerReply, DispatchFuture, DispatchRequest, TcpBroker};
pub use coordinator::{
    CoordinatorConfig, DistributedReport, ReceiveTally, receive_events, run_distributed,
};

use streamglob_proto::protocol::BroadcastMessage;
use tokio::sync::broadcast;

/// Display refresh hook, poked once per monitor pass.
pub trait RefreshSink: Send + Sync {
    fn refresh(&self);
}

/// No receivers is fine: nobody is looking at the task list.
impl RefreshSink for broadcast::Sender<BroadcastMessage> {
    fn refresh(&self) {
        let _ = self.send(BroadcastMessage::TasksUpdated);
    }
}

/// Adapts a closure into a [`RefreshSink`].
pub struct RefreshFn<F>(pub F);

impl<F> RefreshSink for RefreshFn<F>
where
    F: Fn() + Send + Sync,
{
    fn refresh(&self) {
        (self.0)()
    }
}

pub struct NoRefresh;

impl RefreshSink for NoRefresh {
    fn refresh(&self) {}
}

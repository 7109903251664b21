use crate::message::Message;

/// FIFO of messages awaiting transmission, threaded through each message's
/// intrusive link: push walks to the tail in O(n), serve pops the head in
/// O(1). The queue owns nothing beyond the links; a served message is the
/// caller's to transmit and free.
///
/// Owned by a single connection and mutated only from its writer context.
#[derive(Debug, Default)]
pub struct MessageQueue {
    head: Option<Box<Message>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append `msg` at the tail. The message must not already be enqueued
    /// anywhere; single ownership of the `Box` enforces that statically.
    pub fn push(&mut self, msg: Box<Message>) {
        let mut slot = &mut self.head;
        loop {
            match slot {
                Some(node) => slot = &mut node.next,
                None => {
                    *slot = Some(msg);
                    return;
                }
            }
        }
    }

    /// Remove and return the head, or `None` if the queue is empty. The
    /// returned message's link is cleared so it can be enqueued elsewhere.
    pub fn serve(&mut self) -> Option<Box<Message>> {
        let mut msg = self.head.take()?;
        self.head = msg.next.take();
        Some(msg)
    }
}

impl Drop for MessageQueue {
    // Unlink iteratively; letting the boxes drop recursively would consume
    // a stack frame per queued message.
    fn drop(&mut self) {
        while self.serve().is_some() {}
    }
}

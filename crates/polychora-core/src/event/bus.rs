// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log;

/// A generic, multi-producer single-consumer, thread-safe event channel.
///
/// Generic over the event type `T` it transports. There are many senders
/// but only one receiver, so a single authoritative loop processes all
/// events of a given type; senders can be cloned freely and handed to
/// other threads.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new `EventBus` with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!(
            "EventBus initialized for type {}.",
            std::any::type_name::<T>()
        );
        Self { sender, receiver }
    }

    /// Publishes an event.
    ///
    /// Logs instead of failing when the receiver is gone — publication
    /// sites should not have to care whether anyone is still listening.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender half.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver half.
    ///
    /// A reference, so the receiver cannot be moved out of the bus.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Drains every pending event without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping,
        Value(u32),
    }

    #[test]
    fn send_receive_in_order() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Ping);
        bus.publish(TestEvent::Value(7));
        assert_eq!(
            bus.drain(),
            vec![TestEvent::Ping, TestEvent::Value(7)]
        );
        assert!(bus.receiver().is_empty());
    }

    #[test]
    fn cloned_senders_feed_the_same_receiver() {
        let bus = EventBus::<TestEvent>::new();
        let a = bus.sender();
        let b = bus.sender();
        a.send(TestEvent::Value(1)).unwrap();
        b.send(TestEvent::Value(2)).unwrap();
        assert_eq!(bus.drain().len(), 2);
    }
}

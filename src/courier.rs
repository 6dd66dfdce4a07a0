/*!
 * Bounded hand-off queues connecting the pipeline stages.
 *
 * A courier is a multi-producer, multi-consumer FIFO. Each stage registers its endpoints before
 * the stage threads start, which guarantees no receiver can observe a closed queue just because
 * it ran before the senders were set up. Once every endpoint is registered the courier value
 * itself should be dropped so that it does not hold the queue open.
 *
 * Ownership of an item transfers on a successful send; the receiver is responsible for it on
 * every exit path after that. FIFO order holds per producer, the interleaving across producers is
 * unspecified.
 */

use crossbeam_channel::{bounded, Receiver, Sender};

/// A bounded queue under construction. Hand out endpoints, then drop it.
pub struct Courier<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Courier<T> {
    /// Create a new courier holding at most `capacity` items in flight.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Courier { tx, rx }
    }

    /// Register a sending endpoint.
    pub fn register_sender(&self) -> CourierSender<T> {
        CourierSender(self.tx.clone())
    }

    /// Register a receiving endpoint.
    pub fn register_receiver(&self) -> CourierReceiver<T> {
        CourierReceiver(self.rx.clone())
    }
}

/// A registered sending endpoint.
pub struct CourierSender<T>(Sender<T>);

impl<T> CourierSender<T> {
    /// Send an item, blocking while the queue is full.
    ///
    /// Returns false when every receiver has hung up and the item can no longer be delivered;
    /// the stage should wind down when that happens.
    pub fn send(&self, item: T) -> bool {
        self.0.send(item).is_ok()
    }

    /// Signal that this endpoint will send nothing more.
    ///
    /// When the last sender is done the queue closes; receivers drain whatever is left and then
    /// observe end of stream. Dropping the endpoint has the same effect, the method just makes
    /// the hand-off explicit at call sites.
    pub fn done_sending(self) {}
}

/// A registered receiving endpoint.
pub struct CourierReceiver<T>(Receiver<T>);

impl<T> CourierReceiver<T> {
    /// Receive the next item, blocking while the queue is empty and any sender remains.
    ///
    /// Returns `None` once the last sender is done and the queue has drained.
    pub fn receive(&self) -> Option<T> {
        self.0.recv().ok()
    }

    /// Signal that this endpoint will receive nothing more.
    pub fn done_receiving(self) {}
}

impl<T> IntoIterator for CourierReceiver<T> {
    type Item = T;
    type IntoIter = crossbeam_channel::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a CourierReceiver<T> {
    type Item = T;
    type IntoIter = crossbeam_channel::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn items_arrive_in_order() {
        let courier = Courier::new(8);
        let tx = courier.register_sender();
        let rx = courier.register_receiver();
        drop(courier);

        for i in 0..5 {
            assert!(tx.send(i));
        }
        tx.done_sending();

        let received: Vec<i32> = rx.into_iter().collect();
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn receivers_observe_end_of_stream() {
        let courier: Courier<i32> = Courier::new(4);
        let tx = courier.register_sender();
        let rx = courier.register_receiver();
        drop(courier);

        assert!(tx.send(42));
        tx.done_sending();

        assert_eq!(rx.receive(), Some(42));
        assert_eq!(rx.receive(), None);
        assert_eq!(rx.receive(), None);
    }

    #[test]
    fn send_fails_after_receivers_hang_up() {
        let courier: Courier<i32> = Courier::new(4);
        let tx = courier.register_sender();
        let rx = courier.register_receiver();
        drop(courier);

        rx.done_receiving();
        assert!(!tx.send(1));
    }

    #[test]
    fn many_producers_one_consumer() {
        let courier = Courier::new(4);
        let rx = courier.register_receiver();

        let mut handles = Vec::new();
        for worker in 0..4 {
            let tx = courier.register_sender();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    assert!(tx.send(worker * 100 + i));
                }
            }));
        }
        drop(courier);

        let mut received: Vec<i32> = rx.into_iter().collect();

        for handle in handles {
            handle.join().unwrap();
        }

        received.sort_unstable();
        let expected: Vec<i32> = (0..400).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn queue_drains_before_closing() {
        let courier = Courier::new(16);
        let tx = courier.register_sender();
        let rx = courier.register_receiver();
        drop(courier);

        for i in 0..10 {
            assert!(tx.send(i));
        }
        // Sender is gone before the receiver starts reading.
        tx.done_sending();

        let received: Vec<i32> = rx.into_iter().collect();
        assert_eq!(received.len(), 10);
    }
}

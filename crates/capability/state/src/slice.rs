//! 可订阅的状态切片。
//!
//! 每个切片持有一个当前值和一组订阅者。订阅时先收到当前值，之后按写入顺序收到每个新值。
//! 订阅以 [`Subscription`] 句柄表示，句柄被丢弃或调用 `unsubscribe` 后不再推送。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

struct Shared<T> {
    value: T,
    subscribers: Vec<(u64, mpsc::UnboundedSender<T>)>,
    next_id: u64,
}

/// 状态切片。
pub struct Slice<T> {
    name: &'static str,
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T: Clone + Send + 'static> Slice<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            shared: Arc::new(Mutex::new(Shared {
                value,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 当前值的副本。
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// 替换当前值并推送给全部订阅者。
    pub fn set(&self, value: T) {
        let mut guard = self.lock();
        let shared = &mut *guard;
        shared.value = value;
        let current = &shared.value;
        shared
            .subscribers
            .retain(|(_, sender)| sender.send(current.clone()).is_ok());
    }

    /// 值不同时才替换并推送，返回是否发生替换。
    pub fn set_if_changed(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        if self.lock().value == value {
            return false;
        }
        self.set(value);
        true
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let mut shared = self.lock();
        let id = shared.next_id;
        shared.next_id += 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(shared.value.clone());
        shared.subscribers.push((id, sender));
        Subscription {
            id,
            receiver,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// 断开全部订阅者；已推送但未读取的值仍可读出。
    pub fn detach_all(&self) {
        self.lock().subscribers.clear();
    }

    pub fn view(&self) -> SliceView<'_, T> {
        SliceView { slice: self }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 切片的只读视图：可读取、可订阅，不可写入。
pub struct SliceView<'a, T> {
    slice: &'a Slice<T>,
}

impl<T: Clone + Send + 'static> SliceView<'_, T> {
    pub fn name(&self) -> &'static str {
        self.slice.name()
    }

    pub fn get(&self) -> T {
        self.slice.get()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.slice.subscribe()
    }
}

/// 订阅句柄。
pub struct Subscription<T> {
    id: u64,
    receiver: mpsc::UnboundedReceiver<T>,
    shared: Weak<Mutex<Shared<T>>>,
}

impl<T> Subscription<T> {
    /// 等待下一个值；订阅被断开且已无积压值时返回 `None`。
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// 取出一个已推送的值（不等待）。
    pub fn try_next(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// 取出全部已推送的值。
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Ok(value) = self.receiver.try_recv() {
            values.push(value);
        }
        values
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);
            shared.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

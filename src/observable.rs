//! Observable values with a per-field observer list.
//!
//! A marker binds to the fields of its place by subscribing closures here;
//! writes that change the value notify every subscriber in subscription order.

use std::fmt;

type Observer<T> = Box<dyn Fn(&T) + Send>;

pub struct Observable<T> {
    value: T,
    observers: Vec<Observer<T>>,
}

impl<T: PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            observers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value, notifying observers only when it actually changed.
    ///
    /// Returns whether a change happened.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for observer in &self.observers {
            observer(&self.value);
        }
        true
    }

    /// Register an observer. It is not called with the current value.
    pub fn subscribe(&mut self, observer: impl Fn(&T) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl<T: Default + PartialEq> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn notifies_observers_on_change() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut title = Observable::new("Lion Rock".to_string());

        let sink = Arc::clone(&seen);
        title.subscribe(move |v: &String| sink.lock().unwrap().push(v.clone()));

        assert!(title.set("Victoria Peak".to_string()));
        assert_eq!(title.get(), "Victoria Peak");
        assert_eq!(*seen.lock().unwrap(), vec!["Victoria Peak".to_string()]);
    }

    #[test]
    fn unchanged_value_is_silent() {
        let calls = Arc::new(Mutex::new(0));
        let mut flag = Observable::new(true);

        let counter = Arc::clone(&calls);
        flag.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(!flag.set(true));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn subscribe_does_not_replay_current_value() {
        let calls = Arc::new(Mutex::new(0));
        let mut n = Observable::new(1u32);

        let counter = Arc::clone(&calls);
        n.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(n.observer_count(), 1);
    }
}

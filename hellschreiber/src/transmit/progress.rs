use std::{
    sync::Arc,
    thread::{
        self,
        JoinHandle,
    },
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::{
    Condvar,
    Mutex,
};

/// Receives "character sent" marks.
pub trait ProgressSink: Send + Sync + 'static {
    fn character_sent(&self, index: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize) + Send + Sync + 'static,
{
    #[inline]
    fn character_sent(&self, index: usize) {
        self(index)
    }
}

#[derive(Debug, Default)]
struct Cancel {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

/// Fires progress marks at fixed offsets from its start, in order, on its
/// own thread.
#[derive(Debug)]
pub struct ProgressTimer {
    cancel: Arc<Cancel>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressTimer {
    /// Starts the timer now. `offsets` must be increasing.
    pub fn start<P: ProgressSink>(offsets: Vec<Duration>, sink: P) -> std::io::Result<Self> {
        let start = Instant::now();
        let cancel = Arc::new(Cancel::default());

        let thread = thread::Builder::new()
            .name("hell-progress".to_owned())
            .spawn({
                let cancel = cancel.clone();
                move || {
                    for (index, offset) in offsets.into_iter().enumerate() {
                        let deadline = start + offset;
                        let mut cancelled = cancel.cancelled.lock();
                        while !*cancelled {
                            if cancel
                                .condvar
                                .wait_until(&mut cancelled, deadline)
                                .timed_out()
                            {
                                break;
                            }
                        }
                        if *cancelled {
                            tracing::debug!(index, "Progress marks cancelled");
                            return;
                        }
                        drop(cancelled);

                        sink.character_sent(index);
                    }
                }
            })?;

        Ok(Self {
            cancel,
            thread: Some(thread),
        })
    }

    /// Waits until all marks have fired.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Progress sink panicked");
            }
        }
    }

    /// Stops firing marks. Marks already fired stay fired.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        let Some(thread) = self.thread.take()
        else {
            return;
        };

        *self.cancel.cancelled.lock() = true;
        self.cancel.condvar.notify_all();

        if thread.join().is_err() {
            tracing::warn!("Progress sink panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn marks_fire_in_order_after_their_offset() {
        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        let offsets = vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
        ];

        let start = Instant::now();
        let timer = ProgressTimer::start(offsets.clone(), move |index: usize| {
            let _ = sender.lock().send((index, Instant::now()));
        })
        .unwrap();
        timer.join();

        let marks: Vec<(usize, Instant)> = receiver.try_iter().collect();
        assert_eq!(
            marks.iter().map(|(index, _)| *index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        for ((_, fired), offset) in marks.iter().zip(&offsets) {
            assert!(*fired - start >= *offset);
        }
    }

    #[test]
    fn cancel_stops_pending_marks() {
        let (sender, receiver) = mpsc::channel();
        let sender = Mutex::new(sender);
        let timer = ProgressTimer::start(
            vec![Duration::ZERO, Duration::from_secs(60)],
            move |index: usize| {
                let _ = sender.lock().send(index);
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        let cancelled_at = Instant::now();
        timer.cancel();

        assert!(cancelled_at.elapsed() < Duration::from_secs(10));
        assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec![0]);
    }
}

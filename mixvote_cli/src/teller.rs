use super::Verbosity;
use mixvote::Teller;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Reports progress on stderr in 10% steps
pub struct ConsoleTeller {
    verbosity: Verbosity,
    description: Mutex<String>,
    total: AtomicUsize,
    done: AtomicUsize,
}

impl ConsoleTeller {
    pub fn new(verbosity: Verbosity) -> Self {
        ConsoleTeller {
            verbosity,
            description: Mutex::new(String::new()),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        }
    }

    fn enabled(&self) -> bool {
        self.verbosity >= Verbosity::Info
    }
}

impl Teller for ConsoleTeller {
    fn task(&self, description: &str, total: usize) {
        if let Ok(mut current) = self.description.lock() {
            *current = description.to_owned();
        }
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);

        if self.enabled() {
            eprintln!("{} ({} steps)", description, total);
        }
    }

    fn advance(&self, steps: usize) {
        let before = self.done.fetch_add(steps, Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        if !self.enabled() || total == 0 {
            return;
        }

        let tenth_before = before * 10 / total;
        let tenth_after = (before + steps) * 10 / total;
        if tenth_after > tenth_before {
            eprintln!("  {}%", (tenth_after * 10).min(100));
        }
    }

    fn finish(&self) {
        if self.enabled() {
            if let Ok(current) = self.description.lock() {
                eprintln!("{}: done", current);
            }
        }
    }
}

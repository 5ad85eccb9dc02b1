//! The delay and sound timers.
//!
//! Each timer owns a background thread that counts its value down at 60Hz
//! while it is non-zero. The CPU side only ever touches the atomic counter,
//! so `set`/`get` never block on the ticking thread.
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::sound::{Mute, Sound};

pub const TIMER_HZ: u32 = 60;

/// upper bound on how long an idle timer sleeps before rechecking; `set`
/// wakes it sooner
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// which timer a `Timer` is, independent of the state its thread holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Delay,
    Sound,
}

impl Channel {
    fn name(self) -> &'static str {
        match self {
            Channel::Delay => "delay",
            Channel::Sound => "sound",
        }
    }
}

enum TimerKind {
    Delay,
    Sound { sound: Box<dyn Sound>, tone: bool },
}

impl TimerKind {
    /// switch the tone on a zero/non-zero transition only
    fn observe(&mut self, value: u8) {
        if let TimerKind::Sound { sound, tone } = self {
            let want = value > 0;
            if want != *tone {
                if let Err(e) = sound.set_tone(want) {
                    eprintln!("Warning: unable to switch tone {}: {}", on_off(want), e);
                }
                *tone = want;
            }
        }
    }

    fn channel(&self) -> Channel {
        match self {
            TimerKind::Delay => Channel::Delay,
            TimerKind::Sound { .. } => Channel::Sound,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

struct Shared {
    counter: AtomicU8,
    stop: AtomicBool,
}

/// A 60Hz countdown timer running on its own thread.
pub struct Timer {
    channel: Channel,
    shared: Arc<Shared>,
    ticker: Option<JoinHandle<TimerKind>>,
}

impl Timer {
    /// the delay timer; readable and writable by the CPU
    pub fn delay() -> io::Result<Timer> {
        Timer::start(TimerKind::Delay)
    }

    /// the sound timer; `sound` plays while the counter is non-zero
    pub fn sound(sound: Box<dyn Sound>) -> io::Result<Timer> {
        Timer::start(TimerKind::Sound { sound, tone: false })
    }

    fn start(kind: TimerKind) -> io::Result<Timer> {
        let shared = Arc::new(Shared {
            counter: AtomicU8::new(0),
            stop: AtomicBool::new(false),
        });
        let mut timer = Timer {
            channel: kind.channel(),
            shared,
            ticker: None,
        };
        timer.spawn(kind)?;
        Ok(timer)
    }

    fn spawn(&mut self, kind: TimerKind) -> io::Result<()> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("{}-timer", self.channel.name()))
            .spawn(move || tick(kind, shared))?;
        self.ticker = Some(handle);
        Ok(())
    }

    pub fn set(&self, value: u8) {
        self.shared.counter.store(value, Ordering::SeqCst);
        if let Some(ticker) = &self.ticker {
            ticker.thread().unpark();
        }
    }

    pub fn get(&self) -> u8 {
        self.shared.counter.load(Ordering::SeqCst)
    }

    /// Stop the schedule, zero the counter and start counting afresh.
    pub fn reset(&mut self) -> io::Result<()> {
        let kind = self.halt();
        self.shared.counter.store(0, Ordering::SeqCst);
        self.shared.stop.store(false, Ordering::SeqCst);
        self.spawn(kind)
    }

    /// request the ticking thread to stop and wait for it
    fn halt(&mut self) -> TimerKind {
        self.shared.stop.store(true, Ordering::SeqCst);
        let ticker = match self.ticker.take() {
            Some(ticker) => ticker,
            None => return self.fallback(),
        };
        ticker.thread().unpark();
        match ticker.join() {
            Ok(kind) => kind,
            Err(_) => {
                eprintln!("Warning: {} timer thread panicked", self.channel.name());
                self.fallback()
            }
        }
    }

    // used when the thread's state was lost; a lost audio device goes quiet
    fn fallback(&self) -> TimerKind {
        match self.channel {
            Channel::Sound => TimerKind::Sound {
                sound: Box::new(Mute::new()),
                tone: false,
            },
            Channel::Delay => TimerKind::Delay,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if self.ticker.is_some() {
            self.halt();
        }
    }
}

fn tick(mut kind: TimerKind, shared: Arc<Shared>) -> TimerKind {
    let period = Duration::from_secs(1) / TIMER_HZ;
    while !shared.stop.load(Ordering::SeqCst) {
        let value = shared.counter.load(Ordering::SeqCst);
        kind.observe(value);
        if value == 0 {
            thread::park_timeout(IDLE_WAIT);
            continue;
        }
        spin_sleep::sleep(period);
        // the CPU may have rewritten the counter while we slept, so only
        // decrement what is there now and never go below zero
        let _ = shared
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }
    kind.observe(0);
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::ToneLog;
    use std::time::Instant;

    fn wait_for_zero(timer: &Timer, limit: Duration) -> Option<Duration> {
        let start = Instant::now();
        let mut last = timer.get();
        while start.elapsed() < limit {
            let now = timer.get();
            assert!(now <= last, "timer went up from {} to {}", last, now);
            assert!(last - now <= 1, "timer skipped from {} to {}", last, now);
            if now == 0 {
                return Some(start.elapsed());
            }
            last = now;
            thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn test_delay_counts_down_at_60hz() -> io::Result<()> {
        let timer = Timer::delay()?;
        timer.set(30);
        // 30 ticks is half a second; allow one tick early, two late plus
        // some scheduling slack
        let took = wait_for_zero(&timer, Duration::from_secs(3)).expect("never reached 0");
        assert!(took >= Duration::from_millis(480), "too fast: {:?}", took);
        assert!(took <= Duration::from_millis(600), "too slow: {:?}", took);
        // stays at zero
        thread::sleep(Duration::from_millis(50));
        assert_eq!(timer.get(), 0);
        Ok(())
    }

    #[test]
    fn test_delay_reads_back_what_was_set() -> io::Result<()> {
        let timer = Timer::delay()?;
        assert_eq!(timer.get(), 0);
        timer.set(200);
        let v = timer.get();
        assert!(v == 200 || v == 199);
        Ok(())
    }

    #[test]
    fn test_sound_toggles_on_transitions_only() -> io::Result<()> {
        let log = ToneLog::new();
        let timer = Timer::sound(Box::new(log.clone()))?;
        timer.set(3);
        wait_for_zero(&timer, Duration::from_secs(2)).expect("never reached 0");
        thread::sleep(Duration::from_millis(50));
        drop(timer);
        assert_eq!(log.changes(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_sound_muted_when_stopped_early() -> io::Result<()> {
        let log = ToneLog::new();
        let timer = Timer::sound(Box::new(log.clone()))?;
        timer.set(255);
        thread::sleep(Duration::from_millis(50));
        drop(timer);
        assert_eq!(log.changes(), vec![true, false]);
        Ok(())
    }

    #[test]
    fn test_reset_zeroes_and_restarts() -> io::Result<()> {
        let mut timer = Timer::delay()?;
        timer.set(250);
        timer.reset()?;
        assert_eq!(timer.get(), 0);
        timer.set(2);
        assert!(wait_for_zero(&timer, Duration::from_secs(2)).is_some());
        Ok(())
    }

    #[test]
    fn test_fallback_matches_channel() -> io::Result<()> {
        let delay = Timer::delay()?;
        let sound = Timer::sound(Box::new(Mute::new()))?;
        assert_eq!(delay.fallback().channel(), Channel::Delay);
        assert_eq!(sound.fallback().channel(), Channel::Sound);
        assert_eq!(sound.channel.name(), "sound");
        Ok(())
    }

    #[test]
    fn test_reset_keeps_sound_device() -> io::Result<()> {
        let log = ToneLog::new();
        let mut timer = Timer::sound(Box::new(log.clone()))?;
        timer.set(100);
        thread::sleep(Duration::from_millis(30));
        timer.reset()?;
        assert_eq!(log.changes(), vec![true, false]);
        timer.set(1);
        wait_for_zero(&timer, Duration::from_secs(2)).expect("never reached 0");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(log.changes(), vec![true, false, true, false]);
        Ok(())
    }
}

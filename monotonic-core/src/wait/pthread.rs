#![expect(unsafe_code, reason = "pthread condition variables bound to a chosen clock")]

use super::{WaitOutcome, Waiter};
use crate::{ClockId, Error, Result};
use core::{cell::UnsafeCell, mem::MaybeUninit, time::Duration};

struct Shared {
    cond: UnsafeCell<libc::pthread_cond_t>,
    mutex: UnsafeCell<libc::pthread_mutex_t>,
    pending: UnsafeCell<bool>,
}

/// Condition variable whose timed waits use an absolute deadline on `clock`.
pub struct ClockCondvar {
    clock: ClockId,
    shared: Box<Shared>,
}

// SAFETY: the pthread objects live at a fixed heap address and `pending` is
// only accessed with the mutex held.
unsafe impl Send for ClockCondvar {}
// SAFETY: see above.
unsafe impl Sync for ClockCondvar {}

impl ClockCondvar {
    /// Clocks `pthread_condattr_setclock` accepts. glibc and bionic reject
    /// everything but realtime and monotonic with `EINVAL`.
    #[must_use]
    pub const fn supports(clock: ClockId) -> bool {
        matches!(clock, ClockId::Realtime | ClockId::Monotonic)
    }

    pub fn new(clock: ClockId) -> Result<Self> {
        let shared = Box::new(Shared {
            cond: UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER),
            mutex: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
            pending: UnsafeCell::new(false),
        });

        let attr = CondAttr::new(clock)?;
        // SAFETY: `cond` is not shared yet and `attr` is initialized.
        check("pthread_cond_init", unsafe {
            libc::pthread_cond_init(shared.cond.get(), attr.as_ptr())
        })?;

        Ok(Self { clock, shared })
    }

    fn deadline(&self, timeout: Duration) -> Result<libc::timespec> {
        let deadline = self.clock.now()?.saturating_add(timeout);
        // SAFETY: timespec only holds integers, all zeroes is a valid value.
        let mut ts: libc::timespec = unsafe { core::mem::zeroed() };
        ts.tv_sec = libc::time_t::try_from(deadline.as_secs()).unwrap_or(libc::time_t::MAX);
        ts.tv_nsec = libc::c_long::try_from(deadline.subsec_nanos()).unwrap_or_default();
        Ok(ts)
    }

    fn lock(&self) -> Result<Guard<'_>> {
        // SAFETY: the mutex was statically initialized and never moves.
        check("pthread_mutex_lock", unsafe {
            libc::pthread_mutex_lock(self.shared.mutex.get())
        })?;
        Ok(Guard(&self.shared))
    }
}

impl Waiter for ClockCondvar {
    fn clock(&self) -> ClockId {
        self.clock
    }

    fn notify(&self) -> Result<()> {
        let guard = self.lock()?;
        guard.set_pending();
        // SAFETY: the condvar is initialized; signalling with the mutex held.
        check("pthread_cond_signal", unsafe {
            libc::pthread_cond_signal(self.shared.cond.get())
        })
    }

    fn wait(&self, timeout: Duration) -> Result<WaitOutcome> {
        let deadline = self.deadline(timeout)?;
        let guard = self.lock()?;

        loop {
            if guard.take_pending() {
                return Ok(WaitOutcome::Notified);
            }

            // SAFETY: `guard` holds the mutex for the duration of the call.
            let rc = unsafe {
                libc::pthread_cond_timedwait(
                    self.shared.cond.get(),
                    self.shared.mutex.get(),
                    &raw const deadline,
                )
            };

            match rc {
                0 => {}
                libc::ETIMEDOUT if guard.take_pending() => return Ok(WaitOutcome::Notified),
                libc::ETIMEDOUT => return Ok(WaitOutcome::TimedOut),
                code => {
                    return Err(Error::Condvar {
                        op: "pthread_cond_timedwait",
                        code,
                    });
                }
            }
        }
    }
}

impl Drop for ClockCondvar {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no thread holds the mutex or waits on the
        // condvar.
        unsafe {
            libc::pthread_cond_destroy(self.shared.cond.get());
            libc::pthread_mutex_destroy(self.shared.mutex.get());
        }
    }
}

struct Guard<'a>(&'a Shared);

impl Guard<'_> {
    fn set_pending(&self) {
        // SAFETY: the mutex is held while the guard lives.
        unsafe { *self.0.pending.get() = true };
    }

    fn take_pending(&self) -> bool {
        // SAFETY: the mutex is held while the guard lives.
        unsafe { core::mem::replace(&mut *self.0.pending.get(), false) }
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        // SAFETY: this guard locked the mutex.
        unsafe {
            libc::pthread_mutex_unlock(self.0.mutex.get());
        }
    }
}

struct CondAttr(MaybeUninit<libc::pthread_condattr_t>);

impl CondAttr {
    fn new(clock: ClockId) -> Result<Self> {
        let mut attr = MaybeUninit::uninit();
        // SAFETY: `attr` is a valid out pointer.
        check("pthread_condattr_init", unsafe {
            libc::pthread_condattr_init(attr.as_mut_ptr())
        })?;

        // from here on the attr is destroyed on every path
        let mut attr = Self(attr);
        // SAFETY: the attr was initialized above.
        check("pthread_condattr_setclock", unsafe {
            libc::pthread_condattr_setclock(attr.0.as_mut_ptr(), clock.raw())
        })?;

        Ok(attr)
    }

    const fn as_ptr(&self) -> *const libc::pthread_condattr_t {
        self.0.as_ptr()
    }
}

impl Drop for CondAttr {
    fn drop(&mut self) {
        // SAFETY: only constructed after a successful pthread_condattr_init.
        unsafe {
            libc::pthread_condattr_destroy(self.0.as_mut_ptr());
        }
    }
}

fn check(op: &'static str, code: i32) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error::Condvar { op, code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setclock_rejects_boottime() {
        assert!(!ClockCondvar::supports(ClockId::Boottime));
        let err = ClockCondvar::new(ClockId::Boottime).err().unwrap();
        assert!(matches!(
            err,
            Error::Condvar {
                op: "pthread_condattr_setclock",
                code: libc::EINVAL,
            }
        ));
    }

    #[test]
    fn supported_clocks_build() {
        for clock in [ClockId::Realtime, ClockId::Monotonic] {
            assert!(ClockCondvar::supports(clock));
            assert_eq!(ClockCondvar::new(clock).unwrap().clock(), clock);
        }
    }
}

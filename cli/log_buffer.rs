use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

static HELD: Mutex<Option<Vec<u8>>> = Mutex::new(None);

fn held() -> MutexGuard<'static, Option<Vec<u8>>> {
    HELD.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Log target that writes to stderr, or into a buffer while the screen is held.
pub struct DeferredStderr;

impl Write for DeferredStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match held().as_mut() {
            Some(buffer) => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if held().is_some() {
            return Ok(());
        }
        io::stderr().flush()
    }
}

/// Starts buffering log records instead of writing them.
pub fn hold() {
    let mut held = held();
    if held.is_none() {
        *held = Some(Vec::new());
    }
}

/// Stops buffering and writes anything held so far to `out`.
pub fn release_into(out: &mut dyn Write) -> io::Result<()> {
    let buffered = held().take();
    match buffered {
        Some(bytes) if !bytes.is_empty() => {
            out.write_all(&bytes)?;
            out.flush()
        }
        _ => Ok(()),
    }
}

pub fn release() {
    let _ = release_into(&mut io::stderr());
}

//! In-memory serial port shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use simplewebserial_communication::SerialPort;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Handle to inspect and feed a [`MockPort`] after it was moved into a connection
#[derive(Clone, Default)]
pub struct MockPortHandle {
    incoming: Arc<Mutex<VecDeque<Vec<u8>>>>,
    written: Arc<Mutex<Vec<u8>>>,
    ended: Arc<Mutex<bool>>,
    failed: Arc<Mutex<bool>>,
}

impl MockPortHandle {
    /// Queue bytes the device "sends"
    pub fn push(&self, data: &str) {
        self.incoming.lock().push_back(data.as_bytes().to_vec());
    }

    /// Queue raw bytes
    pub fn push_bytes(&self, data: &[u8]) {
        self.incoming.lock().push_back(data.to_vec());
    }

    /// End the stream once the queued data has been read
    pub fn end(&self) {
        *self.ended.lock() = true;
    }

    /// Make every further read fail like an unplugged device
    pub fn fail(&self) {
        *self.failed.lock() = true;
    }

    /// Everything written by the host so far
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written.lock()).into_owned()
    }

    /// Create the port itself
    pub fn port(&self) -> Box<dyn SerialPort> {
        Box::new(MockPort {
            handle: self.clone(),
        })
    }
}

pub struct MockPort {
    handle: MockPortHandle,
}

impl SerialPort for MockPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.handle.written.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if *self.handle.failed.lock() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        let next = self.handle.incoming.lock().pop_front();
        match next {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    self.handle.incoming.lock().push_front(chunk);
                }
                Ok(n)
            }
            None if *self.handle.ended.lock() => Ok(0),
            None => {
                std::thread::sleep(Duration::from_millis(1));
                Err(io::Error::new(io::ErrorKind::TimedOut, "no data"))
            }
        }
    }

    fn name(&self) -> String {
        "mock".to_string()
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or a second has passed
pub fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use rfremote_shared::Transport;

#[derive(Default)]
pub struct Wire {
    pub written: Vec<u8>,
    pub replies: VecDeque<Vec<u8>>,
    /// Lines that only arrive once the next request is written
    pub after_write: VecDeque<Vec<u8>>,
    /// Lines dropped by `discard_input`
    pub discarded: usize,
    pub closed: bool,
}

impl Wire {
    pub fn reply(&mut self, lines: &[&str]) {
        for line in lines {
            self.replies.push_back(format!("{}\r\n", line).into_bytes());
        }
    }

    pub fn reply_after_write(&mut self, lines: &[&str]) {
        for line in lines {
            self.after_write.push_back(format!("{}\r\n", line).into_bytes());
        }
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }
}

/// Scripted transport. Runs out of replies with a timeout.
pub struct MockTransport {
    wire: Rc<RefCell<Wire>>,
}

impl MockTransport {
    pub fn new() -> (Self, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        (MockTransport { wire: wire.clone() }, wire)
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut wire = self.wire.borrow_mut();
        wire.written.extend_from_slice(buf);

        let pending = std::mem::take(&mut wire.after_write);
        wire.replies.extend(pending);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.wire
            .borrow_mut()
            .replies
            .pop_front()
            .ok_or_else(|| io::ErrorKind::TimedOut.into())
    }

    fn discard_input(&mut self) -> io::Result<()> {
        let mut wire = self.wire.borrow_mut();
        wire.discarded += wire.replies.len();
        wire.replies.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.wire.borrow_mut().closed = true;
    }
}

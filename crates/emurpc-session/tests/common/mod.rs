//! A small in-process emulator: memory-backed, answers memory and trap calls.

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use bytes::{Buf, BufMut, BytesMut};
use emurpc_frame::{Frame, FrameError, FrameReader, FrameWriter, Placeholder, Route};

pub const TRAP_MEM_PTR_NEW: u16 = 0xA013;
pub const TRAP_TICKS: u16 = 0xA2E9;
pub const HEAP_BASE: u32 = 0x0001_0000;
pub const TICKS_PER_SECOND: u32 = 100;

pub struct FakeEmulator {
    pub addr: SocketAddr,
    handle: JoinHandle<Vec<Frame>>,
}

impl FakeEmulator {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake emulator");
        let addr = listener.local_addr().expect("local addr");
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept client");
            let mut reader = FrameReader::new(stream.try_clone().expect("clone stream"));
            let mut writer = FrameWriter::new(stream);
            let mut state = State::default();
            let mut requests = Vec::new();

            loop {
                let request = match reader.read_frame() {
                    Ok(frame) => frame,
                    Err(FrameError::ShortRead { received: 0, .. }) => break,
                    Err(err) => panic!("fake emulator read failed: {err}"),
                };
                let body = state.handle(&request.body);
                let route = Route {
                    destination: request.header.source,
                    source: request.header.destination,
                    packet_type: request.header.packet_type,
                };
                let reply = Frame::new(route, request.header.transaction_id, body, &Placeholder)
                    .expect("reply frame");
                requests.push(request);
                writer.write_frame(&reply).expect("write reply");
            }
            requests
        });
        Self { addr, handle }
    }

    /// Wait for the client to disconnect and return every request received.
    pub fn finish(self) -> Vec<Frame> {
        self.handle.join().expect("fake emulator thread")
    }
}

#[derive(Default)]
struct State {
    memory: BTreeMap<u32, u8>,
    next_alloc: u32,
}

impl State {
    fn handle(&mut self, body: &[u8]) -> Vec<u8> {
        let mut req = body;
        let command = req.get_u8();
        req.get_u8();

        let mut reply = BytesMut::new();
        reply.put_u8(command | 0x80);
        reply.put_u8(0);

        match command {
            0x01 => {
                let addr = req.get_u32();
                let len = req.get_u16();
                for i in 0..u32::from(len) {
                    reply.put_u8(*self.memory.get(&(addr + i)).unwrap_or(&0));
                }
            }
            0x02 => {
                let addr = req.get_u32();
                let len = req.get_u16();
                for i in 0..u32::from(len) {
                    self.memory.insert(addr + i, req.get_u8());
                }
            }
            0x0A => {
                let trap = req.get_u16();
                let d0 = req.get_u32();
                let a0 = req.get_u32();
                reply.put_u16(trap);
                reply.put_u32(d0.wrapping_add(u32::from(trap)));
                reply.put_u32(a0.wrapping_add(0x1000));
                reply.put_slice(req);
            }
            0x70 => {
                let trap = req.get_u16();
                let mut d0 = req.get_u32();
                let mut a0 = req.get_u32();
                let _exception = req.get_u16();
                let mask = req.get_u16();
                for _ in 0..mask.count_ones() {
                    req.get_u32();
                }
                match trap {
                    TRAP_MEM_PTR_NEW => {
                        // count, byref, size, then the u32 size value
                        let size = u32::from_be_bytes([req[4], req[5], req[6], req[7]]);
                        a0 = HEAP_BASE + self.next_alloc;
                        self.next_alloc += size;
                    }
                    TRAP_TICKS => d0 = TICKS_PER_SECOND,
                    _ => {}
                }
                reply.put_u16(trap);
                reply.put_u32(d0);
                reply.put_u32(a0);
                reply.put_u16(0);
                reply.put_u16(0);
                reply.put_slice(req);
            }
            _ => {}
        }
        reply.to_vec()
    }
}

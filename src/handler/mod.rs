//! Command handlers.
//!
//! Each handler takes the received request and returns the response to send
//! back.  Handlers only look at `request.args()`, never beyond `arg_len`.
//!
//! | Request | Response | Arguments | Result |
//! |---------|----------|-----------|--------|
//! | [`ToCm7Op::Knock`] | [`ToRvOp::RetKnock`] | any words | XOR of all arguments |
//! | [`ToCm7Op::OffloadTransform`] | [`ToRvOp::RetOffloadTransform`] | 16 words, see [`transform`] | 32 words, or none if the input was short |
//! | [`ToCm7Op::SharedMemoryCompute`] | [`ToRvOp::RetSharedMemoryCompute`] | image address | none, or `[SHARED_MEMORY_REJECTED]` |
//! | [`ToCm7Op::PersistentWrite`] | [`ToRvOp::RetPersistentWrite`] | address, byte length, data words | bytes written |
//!
//! A persistent write which fails validation is answered with zero bytes
//! written, which the peer cannot tell apart from a valid zero length write.
//! This is kept for compatibility with existing peers.

// Copyright (C) 2025 Piers Finlayson <piers@piers.rocks>
//
// MIT License

pub mod transform;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::MAX_PKT_LEN;
use crate::arena::SharedArena;
use crate::config::StorageWindow;
use crate::kernel::{IMAGE_BYTES, ImageGenerator, TransformKernel};
use crate::packet::{Packet, ToRvOp};
use crate::storage::StorageWriter;
use crate::{Error, Result};

/// Single argument of a shared memory compute response when the image
/// address was refused.
pub const SHARED_MEMORY_REJECTED: u32 = 1;

/// Most data bytes a persistent write packet can carry, after the address
/// and length words.
pub const PERSISTENT_WRITE_MAX_DATA: usize = (MAX_PKT_LEN - 2) * 4;

/// The fixed set of commands, one method per request opcode.
pub trait CommandSet {
    fn knock(&mut self, request: &Packet) -> Packet;
    fn offload_transform(&mut self, request: &Packet) -> Packet;
    fn shared_memory_compute(&mut self, request: &Packet) -> Packet;
    fn persistent_write(&mut self, request: &Packet) -> Packet;
}

/// The firmware's command handlers and the collaborators they use.
pub struct Handlers<'a, S: StorageWriter, T: TransformKernel, G: ImageGenerator> {
    storage: S,
    window: StorageWindow,
    transform: T,
    generator: G,
    arena: SharedArena<'a>,
}

impl<'a, S: StorageWriter, T: TransformKernel, G: ImageGenerator> Handlers<'a, S, T, G> {
    pub fn new(
        storage: S,
        window: StorageWindow,
        transform: T,
        generator: G,
        arena: SharedArena<'a>,
    ) -> Self {
        Self {
            storage,
            window,
            transform,
            generator,
            arena,
        }
    }

    pub fn storage(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn arena(&mut self) -> &mut SharedArena<'a> {
        &mut self.arena
    }

    // Checks the request and returns the destination and data to write.
    fn validate_write<'p>(&self, args: &[u32], buf: &'p mut [u8]) -> Result<(u32, &'p [u8])> {
        let (header, data_words) = match args {
            [addr, len, rest @ ..] => ((*addr, *len), rest),
            _ => return Err(Error::ValidationFailure),
        };
        let (addr, len) = header;
        self.window.validate(addr, len)?;

        let len = len as usize;
        if len > data_words.len() * 4 {
            return Err(Error::ValidationFailure);
        }
        for (chunk, word) in buf.chunks_exact_mut(4).zip(data_words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok((addr, &buf[..len]))
    }
}

impl<S: StorageWriter, T: TransformKernel, G: ImageGenerator> CommandSet for Handlers<'_, S, T, G> {
    fn knock(&mut self, request: &Packet) -> Packet {
        knock(request)
    }

    fn offload_transform(&mut self, request: &Packet) -> Packet {
        let mut response = Packet::response(ToRvOp::RetOffloadTransform);
        let input = match transform::decode_input(request.args()) {
            Ok(input) => input,
            Err(_) => {
                warn!("Transform needs {} words, got {}", transform::INPUT_WORDS, request.arg_len);
                return response;
            }
        };

        let output = self.transform.transform(&input);
        if let Ok(len) = transform::encode_output(&output, &mut response.data) {
            response.arg_len = len as u16;
        }
        response
    }

    fn shared_memory_compute(&mut self, request: &Packet) -> Packet {
        let mut response = Packet::response(ToRvOp::RetSharedMemoryCompute);
        let Some(&addr) = request.args().first() else {
            warn!("Shared memory compute without an address");
            return reject_shared_memory(response);
        };
        debug!("Generating image at {addr:#010X}");

        let image = match self.arena.region_mut(addr, IMAGE_BYTES) {
            Ok(region) => region,
            Err(e) => {
                warn!("Image at {addr:#010X} refused: {e:?}");
                return reject_shared_memory(response);
            }
        };
        match <&mut [u8; IMAGE_BYTES]>::try_from(image) {
            Ok(image) => self.generator.generate(image),
            Err(_) => return reject_shared_memory(response),
        }

        response.arg_len = 0;
        response
    }

    fn persistent_write(&mut self, request: &Packet) -> Packet {
        let mut response = Packet::response(ToRvOp::RetPersistentWrite);
        response.arg_len = 1;

        let mut buf = [0u8; PERSISTENT_WRITE_MAX_DATA];
        let (addr, data) = match self.validate_write(request.args(), &mut buf) {
            Ok(valid) => valid,
            Err(_) => {
                warn!("Persistent write {:08X?} failed validation", request.args().get(..2));
                response.data[0] = 0;
                return response;
            }
        };

        match self.storage.write(addr, data) {
            Ok(()) => response.data[0] = data.len() as u32,
            Err(e) => {
                error!("Persistent write of {} bytes at {addr:#010X} failed: {e:?}", data.len());
                response.data[0] = 0;
            }
        }
        response
    }
}

/// XOR every argument word together.
pub fn knock(request: &Packet) -> Packet {
    let mut response = Packet::response(ToRvOp::RetKnock);
    response.data[0] = request.args().iter().fold(0, |acc, &word| acc ^ word);
    response.arg_len = 1;
    response
}

fn reject_shared_memory(mut response: Packet) -> Packet {
    response.data[0] = SHARED_MEMORY_REJECTED;
    response.arg_len = 1;
    response
}

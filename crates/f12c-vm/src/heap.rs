//! The free-list heap allocator.
//!
//! The heap occupies the top of VM memory. Every block carries an 8-byte
//! header `(data_size: int, next: int)`; free blocks are chained through
//! `next` in address order, and a `next` equal to the heap's end address
//! terminates the list. `hp` (here [`Heap::head`]) points at the leftmost
//! free block.
//!
//! Allocation is first-fit with splitting; freeing inserts the block back
//! in address order and coalesces with both neighbours, so the list never
//! holds two physically adjacent free blocks.

use f12c_ops::codec;
use f12c_util::sizes;

use crate::error::VmError;

/// Bytes of a block header: data size plus next pointer.
pub const HEADER_SIZE: usize = sizes::INT * 2;

/// Free-list state. The block bytes themselves live in the VM's memory;
/// the heap only remembers the region bounds and the list head.
#[derive(Debug)]
pub struct Heap {
    start: usize,
    end: usize,
    /// Address of the leftmost free block; `end` when the list is empty.
    head: usize,
}

impl Heap {
    /// Initialise the region `[start, end)` of `memory` as one free block.
    pub fn new(memory: &mut [u8], start: usize, end: usize) -> Result<Self, VmError> {
        if end < start + HEADER_SIZE || end > memory.len() {
            return Err(VmError::OutOfMemory);
        }
        let heap = Self {
            start,
            end,
            head: start,
        };
        heap.write_header(memory, start, (end - start - HEADER_SIZE) as i32, end as i32)?;
        Ok(heap)
    }

    /// The heap-end sentinel value terminating the free list.
    pub fn end_sentinel(&self) -> usize {
        self.end
    }

    /// Address of the leftmost free block, or the sentinel.
    pub fn head(&self) -> usize {
        self.head
    }

    /// First-fit allocation. Returns the data address (just past the
    /// header) of a block with at least `size` data bytes.
    pub fn allocate(&mut self, memory: &mut [u8], size: usize) -> Result<usize, VmError> {
        let mut prev: Option<usize> = None;
        let mut current = self.head;

        while current != self.end {
            let (data_size, next) = self.read_header(memory, current)?;

            if data_size >= size {
                let successor = if data_size - size > HEADER_SIZE {
                    // Split: the prefix becomes the allocation, the suffix
                    // a new free block inheriting the old next pointer.
                    let remainder = current + HEADER_SIZE + size;
                    self.write_header(
                        memory,
                        remainder,
                        (data_size - size - HEADER_SIZE) as i32,
                        next as i32,
                    )?;
                    self.write_header(memory, current, size as i32, self.end as i32)?;
                    remainder
                } else {
                    next
                };

                match prev {
                    Some(prev) => self.write_next(memory, prev, successor as i32)?,
                    None => self.head = successor,
                }
                return Ok(current + HEADER_SIZE);
            }

            prev = Some(current);
            current = next;
        }

        Err(VmError::OutOfMemory)
    }

    /// Return a block to the free list, coalescing with adjacent free
    /// neighbours.
    pub fn free(&mut self, memory: &mut [u8], data_address: usize) -> Result<(), VmError> {
        if data_address < self.start + HEADER_SIZE || data_address >= self.end {
            return Err(VmError::InvalidFree {
                address: data_address as i64,
            });
        }
        let header = data_address - HEADER_SIZE;

        // Find the free blocks around the freed one, keeping the list
        // sorted by address.
        let mut prev: Option<usize> = None;
        let mut next = self.head;
        while next != self.end && next < header {
            prev = Some(next);
            next = self.read_header(memory, next)?.1;
        }

        if next == header {
            return Err(VmError::InvalidFree {
                address: data_address as i64,
            });
        }

        let (mut data_size, _) = self.read_header(memory, header)?;
        self.write_header(memory, header, data_size as i32, next as i32)?;
        match prev {
            Some(prev) => self.write_next(memory, prev, header as i32)?,
            None => self.head = header,
        }

        // Coalesce with the right neighbour.
        if next != self.end && header + HEADER_SIZE + data_size == next {
            let (next_size, next_next) = self.read_header(memory, next)?;
            data_size += HEADER_SIZE + next_size;
            self.write_header(memory, header, data_size as i32, next_next as i32)?;
        }

        // Coalesce the left neighbour into the freed block.
        if let Some(prev) = prev {
            let (prev_size, _) = self.read_header(memory, prev)?;
            if prev + HEADER_SIZE + prev_size == header {
                let (_, merged_next) = self.read_header(memory, header)?;
                self.write_header(
                    memory,
                    prev,
                    (prev_size + HEADER_SIZE + data_size) as i32,
                    merged_next as i32,
                )?;
            }
        }

        Ok(())
    }

    /// The free list as `(address, data_size)` pairs, in list order. Stops
    /// at the first unreadable header.
    pub fn free_list(&self, memory: &[u8]) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        let mut current = self.head;
        while current != self.end {
            let Ok((data_size, next)) = self.read_header(memory, current) else {
                break;
            };
            result.push((current, data_size));
            current = next;
        }
        result
    }

    fn read_header(&self, memory: &[u8], address: usize) -> Result<(usize, usize), VmError> {
        let bad_header = || VmError::InvalidAddress {
            address: address as i64,
        };
        let (data_size, after) = codec::int_from_bytes(memory, address).map_err(|_| bad_header())?;
        let (next, _) = codec::int_from_bytes(memory, after).map_err(|_| bad_header())?;
        if data_size < 0 {
            return Err(bad_header());
        }
        Ok((data_size as usize, next as usize))
    }

    fn write_header(
        &self,
        memory: &mut [u8],
        address: usize,
        data_size: i32,
        next: i32,
    ) -> Result<(), VmError> {
        if address + HEADER_SIZE > memory.len() {
            return Err(VmError::InvalidAddress {
                address: address as i64,
            });
        }
        memory[address..address + sizes::INT].copy_from_slice(&codec::int_to_bytes(data_size));
        memory[address + sizes::INT..address + HEADER_SIZE]
            .copy_from_slice(&codec::int_to_bytes(next));
        Ok(())
    }

    fn write_next(&self, memory: &mut [u8], address: usize, next: i32) -> Result<(), VmError> {
        if address + HEADER_SIZE > memory.len() {
            return Err(VmError::InvalidAddress {
                address: address as i64,
            });
        }
        memory[address + sizes::INT..address + HEADER_SIZE]
            .copy_from_slice(&codec::int_to_bytes(next));
        Ok(())
    }
}

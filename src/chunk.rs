//! Reassembly of acquisitions that were downloaded in several transfers
//!
//! Instruments cap the number of points returned by a single data query, so
//! long records are fetched as a series of transfers, each starting where the
//! previous one ended. Every transfer carries its own framing: a block header
//! in front and a line terminator behind the payload. The [Reassembler] drops
//! that framing and glues the payloads back into one buffer that is identical
//! no matter which chunk size was used for the download.

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Largest number of points a single transfer may request
pub const MAX_CHUNK_SIZE: usize = 10_000_000;

/// Filler for the header of a reassembled buffer
const PLACEHOLDER: u8 = b'X';
const TERMINATOR: u8 = b'\n';

/// Bytes surrounding the payload of one transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Framing {
    pub header_len: usize,
    pub trailer_len: usize,
}

impl Default for Framing {
    /// `#9` followed by nine length digits, and `\n\n`
    fn default() -> Self {
        Framing::new(11, 2)
    }
}

impl Framing {
    pub const fn new(header_len: usize, trailer_len: usize) -> Self {
        Framing {
            header_len,
            trailer_len,
        }
    }

    pub fn len(&self) -> usize {
        self.header_len + self.trailer_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload of a single transfer
    pub fn strip<'a>(&self, transfer: &'a [u8]) -> Result<&'a [u8]> {
        if transfer.len() < self.len() {
            return Err(Error::TruncatedTransfer {
                len: transfer.len(),
                framing: self.len(),
            });
        }
        Ok(&transfer[self.header_len..transfer.len() - self.trailer_len])
    }

    /// Wrap `payload` so that it reads like a single transfer
    pub fn wrap(&self, payload: &[u8]) -> Vec<u8> {
        let mut framed = Vec::with_capacity(payload.len() + self.len());
        framed.resize(self.header_len, PLACEHOLDER);
        framed.extend_from_slice(payload);
        framed.resize(framed.len() + self.trailer_len, TERMINATOR);
        framed
    }
}

/// One planned transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    /// Offset of the first point, counted from the start of the acquisition
    pub start: usize,
    pub points: usize,
}

/// The sequence of transfers needed to fetch `total_points` points
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    total_points: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    pub fn new(total_points: usize, chunk_size: usize) -> Result<Self> {
        if !(1..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(Error::ChunkSize(chunk_size));
        }
        Ok(ChunkPlan {
            total_points,
            chunk_size,
        })
    }

    pub fn total_points(&self) -> usize {
        self.total_points
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of transfers
    pub fn len(&self) -> usize {
        self.total_points.div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.total_points == 0
    }

    pub fn get(&self, index: usize) -> Option<Chunk> {
        let start = index.checked_mul(self.chunk_size)?;
        (start < self.total_points).then(|| Chunk {
            index,
            start,
            points: self.chunk_size.min(self.total_points - start),
        })
    }

    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Collects transfers in plan order and concatenates their payloads
#[derive(Debug)]
pub struct Reassembler {
    plan: ChunkPlan,
    framing: Framing,
    sample_width: usize,
    received: usize,
    payload: Vec<u8>,
}

impl Reassembler {
    /// Fails if the planned acquisition can't be addressed in memory
    ///
    /// The buffer grows as transfers arrive.
    pub fn new(plan: ChunkPlan, framing: Framing, sample_width: usize) -> Result<Self> {
        if plan.total_points().checked_mul(sample_width).is_none() {
            return Err(Error::PlanTooLarge {
                points: plan.total_points(),
                width: sample_width,
            });
        }
        Ok(Reassembler {
            plan,
            framing,
            sample_width,
            received: 0,
            payload: Vec::new(),
        })
    }

    /// Transfers accepted so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Accept the next transfer
    ///
    /// The transfer must carry exactly the points the plan assigns to it.
    pub fn push(&mut self, transfer: &[u8]) -> Result<Chunk> {
        let chunk = self
            .plan
            .get(self.received)
            .ok_or(Error::UnexpectedChunk(self.plan.len()))?;
        let payload = self.framing.strip(transfer)?;
        let expected = chunk.points * self.sample_width;
        if payload.len() != expected {
            return Err(Error::ChunkLength {
                index: chunk.index,
                expected,
                actual: payload.len(),
            });
        }
        trace!(
            "Chunk {} of {}: {} points from {}",
            chunk.index + 1,
            self.plan.len(),
            chunk.points,
            chunk.start
        );
        self.payload.extend_from_slice(payload);
        self.received += 1;
        Ok(chunk)
    }

    /// The concatenated payload of all transfers
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.received != self.plan.len() {
            return Err(Error::MissingChunks {
                received: self.received,
                planned: self.plan.len(),
            });
        }
        debug!(
            "Reassembled {} points from {} transfers",
            self.plan.total_points(),
            self.received
        );
        Ok(self.payload)
    }

    /// Like [Self::finish], but framed like a single transfer
    pub fn finish_framed(self) -> Result<Vec<u8>> {
        let framing = self.framing;
        Ok(framing.wrap(&self.finish()?))
    }
}

/// Reassemble a complete set of transfers
pub fn reassemble<'a>(
    plan: ChunkPlan,
    framing: Framing,
    sample_width: usize,
    transfers: impl IntoIterator<Item = &'a [u8]>,
) -> Result<Vec<u8>> {
    let mut reassembler = Reassembler::new(plan, framing, sample_width)?;
    for transfer in transfers {
        reassembler.push(transfer)?;
    }
    reassembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    /// Emulate an instrument answering the plan's data queries
    fn download(acquisition: &[u8], plan: &ChunkPlan, width: usize) -> Vec<Vec<u8>> {
        let mut header = b"#9".to_vec();
        plan.chunks()
            .map(|c| {
                let bytes = &acquisition[c.start * width..(c.start + c.points) * width];
                header.truncate(2);
                header.extend(format!("{:09}", bytes.len()).bytes());
                let mut transfer = header.clone();
                transfer.extend_from_slice(bytes);
                transfer.extend_from_slice(b"\n\n");
                transfer
            })
            .collect()
    }

    #[test]
    fn plan_covers_all_points() {
        let plan = ChunkPlan::new(25, 10).unwrap();
        let chunks: Vec<_> = plan.chunks().collect();
        assert_eq!(plan.len(), 3);
        assert_eq!(
            chunks,
            vec![
                Chunk {
                    index: 0,
                    start: 0,
                    points: 10
                },
                Chunk {
                    index: 1,
                    start: 10,
                    points: 10
                },
                Chunk {
                    index: 2,
                    start: 20,
                    points: 5
                },
            ]
        );
        assert_eq!(ChunkPlan::new(20, 10).unwrap().len(), 2);
        assert!(ChunkPlan::new(0, 10).unwrap().is_empty());
    }

    #[test]
    fn chunk_size_limits() {
        assert!(matches!(ChunkPlan::new(10, 0), Err(Error::ChunkSize(0))));
        assert!(ChunkPlan::new(10, MAX_CHUNK_SIZE).is_ok());
        assert!(ChunkPlan::new(10, MAX_CHUNK_SIZE + 1).is_err());
    }

    #[test]
    fn huge_point_counts_fail_cleanly() {
        let plan = ChunkPlan::new(usize::MAX, 10).unwrap();
        assert_eq!(plan.len(), usize::MAX / 10 + 1);
        assert_eq!(ChunkPlan::new(usize::MAX, 1).unwrap().len(), usize::MAX);

        let plan = ChunkPlan::new(usize::MAX / 2 + 1, MAX_CHUNK_SIZE).unwrap();
        assert!(Reassembler::new(plan, Framing::default(), 1).is_ok());
        assert!(matches!(
            Reassembler::new(plan, Framing::default(), 2),
            Err(Error::PlanTooLarge { width: 2, .. })
        ));

        // the first transfer is still checked against the plan
        let mut reassembler = Reassembler::new(plan, Framing::default(), 1).unwrap();
        assert!(matches!(
            reassembler.push(b"#9000000001\x01\n\n"),
            Err(Error::ChunkLength {
                index: 0,
                expected: MAX_CHUNK_SIZE,
                actual: 1
            })
        ));
    }

    #[test]
    fn independent_of_chunk_size() {
        let mut rng = StdRng::seed_from_u64(7);
        for width in [1, 2] {
            let points = 1000;
            let mut acquisition = vec![0u8; points * width];
            rng.fill(&mut acquisition[..]);
            let mut results = Vec::new();
            for chunk_size in [1000, 333, 250, 7, 1] {
                let plan = ChunkPlan::new(points, chunk_size).unwrap();
                let transfers = download(&acquisition, &plan, width);
                let buffer = reassemble(
                    plan,
                    Framing::default(),
                    width,
                    transfers.iter().map(Vec::as_slice),
                )
                .unwrap();
                results.push(buffer);
            }
            assert!(results.iter().all(|r| *r == acquisition));
        }
    }

    #[test]
    fn framed_reads_like_single_transfer() {
        let plan = ChunkPlan::new(4, 3).unwrap();
        let transfers = download(&[1, 2, 3, 4], &plan, 1);
        let mut reassembler = Reassembler::new(plan, Framing::default(), 1).unwrap();
        for t in &transfers {
            reassembler.push(t).unwrap();
        }
        let framed = reassembler.finish_framed().unwrap();
        assert_eq!(framed, b"XXXXXXXXXXX\x01\x02\x03\x04\n\n");
        assert_eq!(Framing::default().strip(&framed).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_bad_sequences() {
        let plan = ChunkPlan::new(4, 2).unwrap();
        let transfers = download(&[1, 2, 3, 4], &plan, 1);

        let mut short = Reassembler::new(plan, Framing::default(), 1).unwrap();
        short.push(&transfers[0]).unwrap();
        assert_eq!(short.received(), 1);
        assert!(matches!(
            short.finish(),
            Err(Error::MissingChunks {
                received: 1,
                planned: 2
            })
        ));

        let mut extra = Reassembler::new(plan, Framing::default(), 1).unwrap();
        for t in &transfers {
            extra.push(t).unwrap();
        }
        assert!(matches!(
            extra.push(&transfers[0]),
            Err(Error::UnexpectedChunk(2))
        ));

        let mut wrong = Reassembler::new(plan, Framing::default(), 2).unwrap();
        assert!(matches!(
            wrong.push(&transfers[0]),
            Err(Error::ChunkLength {
                index: 0,
                expected: 4,
                actual: 2
            })
        ));

        assert!(matches!(
            Framing::default().strip(b"#9000"),
            Err(Error::TruncatedTransfer { len: 5, framing: 13 })
        ));
    }
}

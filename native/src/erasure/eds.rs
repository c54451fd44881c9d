//! The extended data square and its construction/repair.

use crate::dah::{axis_root, DataAvailabilityHeader};
use crate::namespace::NAMESPACE_SIZE;
use crate::square::{Square, MAX_SQUARE_SIZE_UPPER_BOUND};
use crate::utils::{exact_sqrt, is_pow2, par_map_indexed};
use super::codec::{ensure_equal_len, Codec};
use super::{decode_axis, ErasureError};

/// Orientation of an axis of the square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Col,
}

/// A `2k × 2k` square of shares, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedDataSquare {
    width: usize,
    shares: Vec<Vec<u8>>,
}

impl ExtendedDataSquare {
    /// Side of the extended square (`2k`).
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Side of the original square (`k`).
    #[inline]
    pub fn original_width(&self) -> usize {
        self.width / 2
    }

    pub fn share(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.width || col >= self.width {
            return None;
        }
        Some(&self.shares[row * self.width + col])
    }

    pub fn row(&self, i: usize) -> Option<Vec<&[u8]>> {
        (i < self.width).then(|| self.axis(Axis::Row, i))
    }

    pub fn col(&self, i: usize) -> Option<Vec<&[u8]>> {
        (i < self.width).then(|| self.axis(Axis::Col, i))
    }

    /// Shares of one axis; `i` must be below `width`.
    pub(crate) fn axis(&self, axis: Axis, i: usize) -> Vec<&[u8]> {
        let w = self.width;
        match axis {
            Axis::Row => self.shares[i * w..(i + 1) * w].iter().map(Vec::as_slice).collect(),
            Axis::Col => (0..w).map(|r| self.shares[r * w + i].as_slice()).collect(),
        }
    }

    /// Q0 shares, row-major.
    pub fn flattened_original(&self) -> Vec<Vec<u8>> {
        let k = self.original_width();
        (0..k)
            .flat_map(|r| self.shares[r * self.width..r * self.width + k].iter().cloned())
            .collect()
    }

    /// Recover a partially available square (`None` = withheld share,
    /// row-major over `2k × 2k`) and check every axis against `dah`.
    ///
    /// Rows and columns with at least `k` shares are decoded in turn until
    /// the square is complete. If a pass makes no progress the square is
    /// [`ErasureError::Unrepairable`]. Once complete, every axis root is
    /// recomputed; the first one that disagrees with the header is reported
    /// as [`ErasureError::ByzantineAxis`].
    pub fn repair(mut partial: Vec<Option<Vec<u8>>>, dah: &DataAvailabilityHeader) -> Result<Self, ErasureError> {
        let width = dah.row_roots().len();
        if width < 2 || !is_pow2(width) || dah.column_roots().len() != width {
            return Err(ErasureError::InvalidDimension("header does not describe a 2k x 2k square"));
        }
        if partial.len() != width * width {
            return Err(ErasureError::InvalidDimension("partial square does not match header width"));
        }
        let k = width / 2;
        let cell = |axis: Axis, i: usize, j: usize| match axis {
            Axis::Row => i * width + j,
            Axis::Col => j * width + i,
        };

        loop {
            let missing = partial.iter().filter(|s| s.is_none()).count();
            if missing == 0 {
                break;
            }
            let mut progress = false;
            for axis in [Axis::Row, Axis::Col] {
                for i in 0..width {
                    let line: Vec<Option<Vec<u8>>> = (0..width).map(|j| partial[cell(axis, i, j)].clone()).collect();
                    let present = line.iter().filter(|s| s.is_some()).count();
                    if present == width || present < k {
                        continue;
                    }
                    let full = decode_axis(&line)?;
                    for (j, share) in full.into_iter().enumerate() {
                        let slot = &mut partial[cell(axis, i, j)];
                        if slot.is_none() {
                            *slot = Some(share);
                        }
                    }
                    progress = true;
                }
            }
            if !progress {
                return Err(ErasureError::Unrepairable { missing });
            }
        }

        let shares: Vec<Vec<u8>> = partial.into_iter().flatten().collect();
        let eds = Self { width, shares };
        for (axis, roots) in [(Axis::Row, dah.row_roots()), (Axis::Col, dah.column_roots())] {
            for (i, expected) in roots.iter().enumerate() {
                match axis_root(i, &eds.axis(axis, i), k) {
                    Ok(root) if &root == expected => {}
                    _ => return Err(ErasureError::ByzantineAxis { axis, index: i }),
                }
            }
        }
        Ok(eds)
    }
}

/// Extend a laid-out square.
pub fn extend(square: &Square) -> Result<ExtendedDataSquare, ErasureError> {
    extend_shares(square.shares())
}

/// Extend `k * k` row-major shares into a `2k × 2k` square.
pub fn extend_shares<T>(shares: &[T]) -> Result<ExtendedDataSquare, ErasureError>
where
    T: AsRef<[u8]> + Sync,
{
    if shares.is_empty() {
        return Err(ErasureError::InvalidDimension("square holds no shares"));
    }
    let k = exact_sqrt(shares.len()).ok_or(ErasureError::InvalidDimension("share count is not a perfect square"))?;
    if !is_pow2(k) {
        return Err(ErasureError::InvalidDimension("square side is not a power of two"));
    }
    if k > MAX_SQUARE_SIZE_UPPER_BOUND {
        return Err(ErasureError::InvalidDimension("square side exceeds the maximum"));
    }
    if ensure_equal_len(shares)? < NAMESPACE_SIZE {
        return Err(ErasureError::InvalidDimension("share shorter than a namespace"));
    }

    let codec = Codec::cached(k)?;
    let q1 = par_map_indexed(k, |r| codec.encode(&shares[r * k..(r + 1) * k]))?;
    let q2 = par_map_indexed(k, |c| {
        let col: Vec<&[u8]> = (0..k).map(|r| shares[r * k + c].as_ref()).collect();
        codec.encode(&col)
    })?;
    // q2[c][i] sits at row k + i, column c.
    let q3 = par_map_indexed(k, |i| {
        let row: Vec<&[u8]> = (0..k).map(|c| q2[c][i].as_slice()).collect();
        codec.encode(&row)
    })?;

    let width = 2 * k;
    let mut out = Vec::with_capacity(width * width);
    for (r, parity) in q1.into_iter().enumerate() {
        out.extend(shares[r * k..(r + 1) * k].iter().map(|s| s.as_ref().to_vec()));
        out.extend(parity);
    }
    for (i, parity) in q3.into_iter().enumerate() {
        out.extend((0..k).map(|c| q2[c][i].clone()));
        out.extend(parity);
    }
    Ok(ExtendedDataSquare { width, shares: out })
}

/* --------------------------------- Tests -------------------------------- */

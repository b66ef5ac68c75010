//! Matlab-style frame range lists.
//!
//! A list is comma separated; each item is `i`, `a:b`, `a:step:b`, or an
//! open-ended `a:` / `a:step:` running to the last frame. Bounds are
//! inclusive and 0-based.

use crate::error::{TrajError, TrajResult};

pub fn parse_range_list(spec: &str, n_frames: usize) -> TrajResult<Vec<usize>> {
    let mut out = Vec::new();
    for item in spec.split(',').map(str::trim) {
        if item.is_empty() {
            return Err(TrajError::Invalid(format!("empty item in range list '{spec}'")));
        }
        let parts: Vec<&str> = item.split(':').map(str::trim).collect();
        let (start, step, end) = match parts.as_slice() {
            [single] => {
                let v = parse_index(single, item)?;
                (v, 1, Some(v))
            }
            [a, b] => (parse_index(a, item)?, 1, parse_end(b, item)?),
            [a, s, b] => (parse_index(a, item)?, parse_index(s, item)?, parse_end(b, item)?),
            _ => {
                return Err(TrajError::Invalid(format!("malformed range '{item}'")));
            }
        };
        if step == 0 {
            return Err(TrajError::Invalid(format!("zero step in range '{item}'")));
        }
        let end = match end {
            Some(end) => end,
            None if n_frames == 0 => {
                return Err(TrajError::OutOfRange {
                    index: start,
                    n_frames,
                })
            }
            None => n_frames - 1,
        };
        if end < start {
            return Err(TrajError::Invalid(format!("descending range '{item}'")));
        }
        if end >= n_frames {
            return Err(TrajError::OutOfRange {
                index: end,
                n_frames,
            });
        }
        out.extend((start..=end).step_by(step));
    }
    Ok(out)
}

/// Frames to visit: an explicit range list wins, otherwise every frame after
/// skipping the first `skip`.
pub fn frame_list(n_frames: usize, skip: usize, range: Option<&str>) -> TrajResult<Vec<usize>> {
    match range {
        Some(spec) if !spec.trim().is_empty() => parse_range_list(spec, n_frames),
        _ => {
            if skip >= n_frames && n_frames > 0 {
                return Err(TrajError::Invalid(format!(
                    "skip of {skip} frames leaves nothing of a {n_frames}-frame trajectory"
                )));
            }
            Ok((skip..n_frames).collect())
        }
    }
}

fn parse_index(token: &str, item: &str) -> TrajResult<usize> {
    token
        .parse::<usize>()
        .map_err(|_| TrajError::Invalid(format!("invalid number '{token}' in range '{item}'")))
}

fn parse_end(token: &str, item: &str) -> TrajResult<Option<usize>> {
    if token.is_empty() {
        return Ok(None);
    }
    parse_index(token, item).map(Some)
}

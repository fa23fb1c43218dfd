use std::fmt;
use std::str::FromStr;

use crate::error::VideoError;

/// The `-P` projection argument minicap is started with:
/// `{RealWidth}x{RealHeight}@{VirtualWidth}x{VirtualHeight}/{Orientation}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionSpec {
    pub real_width: u32,
    pub real_height: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
    /// Rotation in degrees: 0, 90, 180 or 270.
    pub orientation: u32,
}

impl ProjectionSpec {
    /// Capture the full screen without scaling or rotation.
    pub fn unscaled(width: u32, height: u32) -> Self {
        Self {
            real_width: width,
            real_height: height,
            virtual_width: width,
            virtual_height: height,
            orientation: 0,
        }
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}x{}/{}",
            self.real_width,
            self.real_height,
            self.virtual_width,
            self.virtual_height,
            self.orientation
        )
    }
}

impl FromStr for ProjectionSpec {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VideoError::Decode(format!("invalid projection {s:?}"));

        let (real, rest) = s.split_once('@').ok_or_else(invalid)?;
        let (virt, orientation) = rest.split_once('/').ok_or_else(invalid)?;
        let dims = |part: &str| -> Result<(u32, u32), VideoError> {
            let (w, h) = part.split_once('x').ok_or_else(invalid)?;
            Ok((
                w.parse().map_err(|_| invalid())?,
                h.parse().map_err(|_| invalid())?,
            ))
        };

        let (real_width, real_height) = dims(real)?;
        let (virtual_width, virtual_height) = dims(virt)?;
        let orientation: u32 = orientation.parse().map_err(|_| invalid())?;
        if !matches!(orientation, 0 | 90 | 180 | 270) {
            return Err(invalid());
        }

        Ok(Self {
            real_width,
            real_height,
            virtual_width,
            virtual_height,
            orientation,
        })
    }
}

use naia_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// Level of detail: the viewer position and the threshold that decides how
/// finely the structure is subdivided around it
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Lod {
    pub position: [f32; 3],
    pub threshold: f32,
}

impl Lod {
    pub fn new(position: [f32; 3], threshold: f32) -> Self {
        Self {
            position,
            threshold,
        }
    }

    /// A default (zero threshold) lod only appears in sentinel records
    pub fn is_valid(&self) -> bool {
        self.threshold > 0.0
    }

    /// Whether a cell at `minimum` with edge length `size` is subdivided at
    /// this level of detail
    pub fn should_subdivide(&self, minimum: [f32; 3], size: f32) -> bool {
        let half = size * 0.5;
        let distance_squared: f32 = (0..3)
            .map(|axis| {
                let delta = minimum[axis] + half - self.position[axis];
                delta * delta
            })
            .sum();
        size >= distance_squared.sqrt() * self.threshold
    }

    /// Whether a cell is subdivided at this level of detail but was not at
    /// `reference`
    pub fn becomes_subdivided(&self, minimum: [f32; 3], size: f32, reference: &Lod) -> bool {
        self.should_subdivide(minimum, size) && !reference.should_subdivide(minimum, size)
    }
}

impl Serde for Lod {
    fn ser(&self, writer: &mut dyn BitWrite) {
        for coordinate in self.position {
            coordinate.to_bits().ser(writer);
        }
        self.threshold.to_bits().ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut position = [0.0; 3];
        for coordinate in position.iter_mut() {
            *coordinate = f32::from_bits(u32::de(reader)?);
        }
        let threshold = f32::from_bits(u32::de(reader)?);
        Ok(Self {
            position,
            threshold,
        })
    }

    fn bit_length(&self) -> u32 {
        32 * 4
    }
}

//! # Texture-Encoded State Store
//!
//! A variable's state is a `width × height` grid of [`Texel`]s, double
//! buffered: kernels read the *front* buffer (last step's result) and write
//! the *back* buffer, which becomes the front on [`PingPong::swap`].
//!
//! Host-side mutation goes through [`SlotPatch`] lists that replace whole
//! texels at given slots. Patching at slot granularity means a write built
//! from an older readback never rolls back the rest of the texture.

use orbis_core::error::{OrbisError, OrbisResult};
use orbis_core::Texel;

/// A fixed-size grid of texels
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    texels: Vec<Texel>,
}

/// Replacement of one whole slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotPatch {
    pub slot: usize,
    pub texel: Texel,
}

impl SlotPatch {
    pub fn new(slot: usize, texel: Texel) -> Self {
        Self { slot, texel }
    }
}

impl Texture {
    /// Allocate a zero-initialized texture
    pub fn new(width: usize, height: usize) -> OrbisResult<Self> {
        if width == 0 || height == 0 {
            return Err(OrbisError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            texels: vec![Texel::ZERO; width * height],
        })
    }

    /// Allocate a texture with every slot produced by `f`
    pub fn from_fn(width: usize, height: usize, f: impl FnMut(usize) -> Texel) -> OrbisResult<Self> {
        let mut texture = Self::new(width, height)?;
        texture.texels = (0..width * height).map(f).collect();
        Ok(texture)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of slots
    #[inline]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Read one slot
    pub fn read(&self, slot: usize) -> OrbisResult<Texel> {
        self.texels
            .get(slot)
            .copied()
            .ok_or(OrbisError::SlotOutOfRange {
                slot,
                capacity: self.len(),
            })
    }

    /// Replace one slot (all four channels)
    pub fn write(&mut self, slot: usize, texel: Texel) -> OrbisResult<()> {
        let capacity = self.len();
        let target = self
            .texels
            .get_mut(slot)
            .ok_or(OrbisError::SlotOutOfRange { slot, capacity })?;
        *target = texel;
        Ok(())
    }

    /// Apply a batch of slot replacements
    ///
    /// The batch is checked before anything is written, so a bad slot
    /// leaves the texture untouched.
    pub fn apply(&mut self, patches: &[SlotPatch]) -> OrbisResult<()> {
        if let Some(bad) = patches.iter().find(|p| p.slot >= self.len()) {
            return Err(OrbisError::SlotOutOfRange {
                slot: bad.slot,
                capacity: self.len(),
            });
        }
        for patch in patches {
            self.texels[patch.slot] = patch.texel;
        }
        Ok(())
    }

    /// All slots, row-major
    #[inline]
    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    #[inline]
    pub(crate) fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.texels
    }

    /// Raw float bytes, ready for a GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// Front/back buffer pair of one variable
#[derive(Clone, Debug)]
pub struct PingPong {
    buffers: [Texture; 2],
    front: usize,
}

impl PingPong {
    /// Both buffers start as copies of `initial`
    pub fn new(initial: Texture) -> Self {
        Self {
            buffers: [initial.clone(), initial],
            front: 0,
        }
    }

    /// Last completed step (what kernels read and readbacks see)
    #[inline]
    pub fn front(&self) -> &Texture {
        &self.buffers[self.front]
    }

    /// Host writes land here, becoming input of the next step
    #[inline]
    pub fn front_mut(&mut self) -> &mut Texture {
        &mut self.buffers[self.front]
    }

    /// Buffer the current step writes into
    #[inline]
    pub fn back_mut(&mut self) -> &mut Texture {
        &mut self.buffers[1 - self.front]
    }

    /// Exchange front and back; once per step, after every kernel ran
    #[inline]
    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }
}

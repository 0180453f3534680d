#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library mapping warehouse slot addresses to 3D positions."]
#![doc = ""]
#![doc = "This crate provides the address, grid and rack dimension types and the pure"]
#![doc = "mapping from a (street, rack, level, slot) address to the slot centroid and"]
#![doc = "to the aisle standoff point where a vehicle parks to serve that slot."]

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub mod position;
pub use error::LayoutError;
pub use position::Position3;

/// A storage slot address `(street, rack, level, slot)`.
///
/// All components are 1-based. An address carries no geometry of its own; it is
/// resolved against a [`Layout`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WarehouseAddress {
    /// Street (aisle block) index.
    pub street: u32,
    /// Rack index along the street.
    pub rack: u32,
    /// Shelf level, 1 being the floor level.
    pub level: u32,
    /// Slot index within the rack level.
    pub slot: u32,
}

impl WarehouseAddress {
    /// Construct a new address.
    pub const fn new(street: u32, rack: u32, level: u32, slot: u32) -> Self {
        WarehouseAddress { street, rack, level, slot }
    }
}

impl fmt::Display for WarehouseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.street, self.rack, self.level, self.slot)
    }
}

/// Grid size of the warehouse: `streets × racks_per_street × levels × slots_per_level`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Number of streets.
    pub streets: u32,
    /// Number of racks along each street.
    pub racks_per_street: u32,
    /// Number of shelf levels per rack.
    pub levels: u32,
    /// Number of slots per rack level.
    pub slots_per_level: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            streets: 10,
            racks_per_street: 20,
            levels: 4,
            slots_per_level: 2,
        }
    }
}

impl LayoutConfig {
    /// Check that every grid count is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidDimensions)` naming the first zero count.
    pub fn check(&self) -> Result<(), LayoutError> {
        if self.streets == 0 {
            return Err(LayoutError::InvalidDimensions("streets must be non-zero"));
        }
        if self.racks_per_street == 0 {
            return Err(LayoutError::InvalidDimensions("racks_per_street must be non-zero"));
        }
        if self.levels == 0 {
            return Err(LayoutError::InvalidDimensions("levels must be non-zero"));
        }
        if self.slots_per_level == 0 {
            return Err(LayoutError::InvalidDimensions("slots_per_level must be non-zero"));
        }
        Ok(())
    }

    /// Check that `address` lies within the grid.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidAddress)` for the first component that is
    /// zero or larger than its bound.
    pub fn validate(&self, address: &WarehouseAddress) -> Result<(), LayoutError> {
        let components = [
            ("street", address.street, self.streets),
            ("rack", address.rack, self.racks_per_street),
            ("level", address.level, self.levels),
            ("slot", address.slot, self.slots_per_level),
        ];
        for (field, value, max) in components {
            if value == 0 || value > max {
                return Err(LayoutError::InvalidAddress { field, value, max });
            }
        }
        Ok(())
    }

    /// Total number of slots in the grid.
    pub fn capacity(&self) -> u64 {
        u64::from(self.streets)
            * u64::from(self.racks_per_street)
            * u64::from(self.levels)
            * u64::from(self.slots_per_level)
    }

    /// Every valid address, in street, rack, level, slot order.
    pub fn addresses(&self) -> Addresses {
        Addresses {
            config: *self,
            next: self.check().ok().map(|_| WarehouseAddress::new(1, 1, 1, 1)),
        }
    }
}

/// Iterator over all addresses of a [`LayoutConfig`].
#[derive(Debug, Clone)]
pub struct Addresses {
    config: LayoutConfig,
    next: Option<WarehouseAddress>,
}

impl Iterator for Addresses {
    type Item = WarehouseAddress;

    fn next(&mut self) -> Option<WarehouseAddress> {
        let current = self.next?;
        let c = &self.config;
        let mut n = current;
        n.slot += 1;
        if n.slot > c.slots_per_level {
            n.slot = 1;
            n.level += 1;
        }
        if n.level > c.levels {
            n.level = 1;
            n.rack += 1;
        }
        if n.rack > c.racks_per_street {
            n.rack = 1;
            n.street += 1;
        }
        self.next = (n.street <= c.streets).then_some(n);
        Some(current)
    }
}

/// Physical rack measurements, in meters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RackDimensions {
    /// Rack length along the row.
    pub rack_width: f64,
    /// Height of one level.
    pub rack_height: f64,
    /// Rack depth across the street.
    pub rack_depth: f64,
    /// Width of the aisle between two rack blocks.
    pub street_gap: f64,
    /// Spacing between neighbouring racks in a row.
    pub rack_gap: f64,
}

impl Default for RackDimensions {
    fn default() -> Self {
        RackDimensions {
            rack_width: 1.5,
            rack_height: 1.0,
            rack_depth: 1.0,
            street_gap: 3.0,
            rack_gap: 0.2,
        }
    }
}

impl RackDimensions {
    /// Check that all measurements are usable.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidRackGeometry)` if a rack size is not a
    /// positive finite number or a gap is negative or not finite.
    pub fn check(&self) -> Result<(), LayoutError> {
        let sizes = [self.rack_width, self.rack_height, self.rack_depth];
        if !sizes.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(LayoutError::InvalidRackGeometry("rack sizes must be positive and finite"));
        }
        let gaps = [self.street_gap, self.rack_gap];
        if !gaps.iter().all(|g| g.is_finite() && *g >= 0.0) {
            return Err(LayoutError::InvalidRackGeometry("gaps must be non-negative and finite"));
        }
        Ok(())
    }

    /// Distance between the centres of two neighbouring streets.
    pub fn street_pitch(&self) -> f64 {
        self.rack_depth * 2.0 + self.street_gap
    }

    /// Distance between the centres of two neighbouring racks in a row.
    pub fn rack_pitch(&self) -> f64 {
        self.rack_width + self.rack_gap
    }
}

/// Default distance from a rack face to the parking line in the aisle.
pub const DEFAULT_AISLE_OFFSET: f64 = 1.5;

/// Address-to-position mapper for a validated grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    config: LayoutConfig,
    dims: RackDimensions,
    aisle_offset: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            config: LayoutConfig::default(),
            dims: RackDimensions::default(),
            aisle_offset: DEFAULT_AISLE_OFFSET,
        }
    }
}

impl Layout {
    /// Construct a layout.
    ///
    /// # Arguments
    ///
    /// * `config`: Grid size.
    /// * `dims`: Rack measurements.
    /// * `aisle_offset`: Distance from the rack face to the aisle parking line.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidDimensions)` for a zero grid count and
    /// `Err(LayoutError::InvalidRackGeometry)` for unusable measurements or an
    /// aisle offset that is negative or not finite.
    pub fn new(config: LayoutConfig, dims: RackDimensions, aisle_offset: f64) -> Result<Self, LayoutError> {
        config.check()?;
        dims.check()?;
        if !(aisle_offset.is_finite() && aisle_offset >= 0.0) {
            return Err(LayoutError::InvalidRackGeometry("aisle offset must be non-negative and finite"));
        }
        Ok(Layout { config, dims, aisle_offset })
    }

    /// Returns the grid size.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Returns the rack measurements.
    pub fn dimensions(&self) -> &RackDimensions {
        &self.dims
    }

    /// Returns the aisle offset.
    pub fn aisle_offset(&self) -> f64 {
        self.aisle_offset
    }

    /// Check `address` against the grid.
    ///
    /// # Errors
    ///
    /// See [`LayoutConfig::validate`].
    pub fn validate(&self, address: &WarehouseAddress) -> Result<(), LayoutError> {
        self.config.validate(address)
    }

    /// Centroid of the slot volume at `address`.
    ///
    /// Slots split the rack width evenly; slot `k` of `n` sits at
    /// `-w/2 + (k - 0.5) * w/n` from the rack centre.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidAddress)` if `address` is outside the grid.
    pub fn position_of(&self, address: &WarehouseAddress) -> Result<Position3, LayoutError> {
        self.validate(address)?;
        let d = &self.dims;

        let street_x = f64::from(address.street - 1) * d.street_pitch();
        let rack_z = f64::from(address.rack - 1) * d.rack_pitch();
        let level_y = f64::from(address.level - 1) * d.rack_height;

        let slot_width = d.rack_width / f64::from(self.config.slots_per_level);
        let slot_offset = -d.rack_width / 2.0 + (f64::from(address.slot) - 0.5) * slot_width;

        Ok(Position3::new(street_x, level_y + d.rack_height / 2.0, rack_z + slot_offset))
    }

    /// Floor-level point in the aisle beside the rack holding `address`.
    ///
    /// The aisle lies on the low-`x` side of the rack; the point keeps the slot's
    /// along-row coordinate.
    ///
    /// # Errors
    ///
    /// Returns `Err(LayoutError::InvalidAddress)` if `address` is outside the grid.
    pub fn aisle_standoff_of(&self, address: &WarehouseAddress) -> Result<Position3, LayoutError> {
        let slot = self.position_of(address)?;
        Ok(Position3::new(slot.x - self.dims.rack_depth - self.aisle_offset, 0.0, slot.z))
    }
}

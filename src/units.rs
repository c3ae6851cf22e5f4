use std::collections::HashMap;

use crate::util::num::format_number;

/// A unit of measure.
///
/// Units are pure data: a symbol as it appears in formulas and a readable
/// name. The engine attaches no conversion semantics to them; it only needs
/// to recognize a word as a unit and to carry it alongside numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// The symbol as written in formulas (`yd`, `lb`).
    pub symbol: String,
    /// The readable name (`yard`, `pound`).
    pub name:   String,
}

impl Unit {
    /// Creates a unit from its symbol and name.
    #[must_use]
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self { symbol: symbol.into(),
               name:   name.into(), }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A number paired with a unit of measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// The numeric magnitude.
    pub value: f64,
    /// The unit the magnitude is expressed in.
    pub unit:  Unit,
}

impl Quantity {
    /// Creates a quantity from a magnitude and a unit.
    #[must_use]
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", format_number(self.value), self.unit.symbol)
    }
}

/// The unit catalog: an external symbol → unit lookup.
///
/// Consulted by the parser when a bare word might represent a unit. The
/// catalog is data-only; registering a symbol is all it takes for literals
/// like `3 yd` to become quantities during evaluation.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: HashMap<String, Unit>,
}

impl UnitCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self { units: HashMap::new() }
    }

    /// Creates a catalog seeded with the base units.
    ///
    /// # Example
    /// ```
    /// use formulary::units::UnitCatalog;
    ///
    /// let catalog = UnitCatalog::with_base_units();
    /// assert_eq!(catalog.lookup("yd").unwrap().name, "yard");
    /// assert!(catalog.lookup("zz").is_none());
    /// ```
    #[must_use]
    pub fn with_base_units() -> Self {
        let mut catalog = Self::new();
        for (symbol, name) in BASE_UNITS {
            catalog.add(Unit::new(*symbol, *name));
        }

        catalog
    }

    /// Registers a unit, replacing any previous unit with the same symbol.
    pub fn add(&mut self, unit: Unit) {
        self.units.insert(unit.symbol.clone(), unit);
    }

    /// Looks a unit up by its symbol.
    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<&Unit> {
        self.units.get(symbol)
    }
}

/// Symbols recognized out of the box.
pub const BASE_UNITS: &[(&str, &str)] = &[("yd", "yard"),
                                          ("ft", "foot"),
                                          ("m", "meter"),
                                          ("lb", "pound"),
                                          ("kg", "kilogram"),
                                          ("s", "second")];

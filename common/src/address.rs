//! Cascading address filter: division → district → ward → area.
//!
//! Each level's options depend on the value selected one level up. Picking a
//! value clears everything below it and produces a request for the next
//! level's options. Option lookups are asynchronous and may resolve out of
//! order, so every request carries a token and only the newest token per
//! level is allowed to install options.

use serde::{Deserialize, Serialize};

/// One level of the address hierarchy, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressLevel {
    Division,
    District,
    Ward,
    Area,
}

impl AddressLevel {
    pub const ALL: [AddressLevel; 4] = [
        AddressLevel::Division,
        AddressLevel::District,
        AddressLevel::Ward,
        AddressLevel::Area,
    ];

    fn index(self) -> usize {
        match self {
            AddressLevel::Division => 0,
            AddressLevel::District => 1,
            AddressLevel::Ward => 2,
            AddressLevel::Area => 3,
        }
    }

    /// The level whose options depend on this one.
    pub fn child(self) -> Option<AddressLevel> {
        AddressLevel::ALL.get(self.index() + 1).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            AddressLevel::Division => "Division",
            AddressLevel::District => "District",
            AddressLevel::Ward => "Ward",
            AddressLevel::Area => "Area",
        }
    }
}

/// A fully specified location, as attached to a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub division: String,
    pub district: String,
    pub ward: String,
    pub area: String,
}

impl Address {
    pub fn get(&self, level: AddressLevel) -> &str {
        match level {
            AddressLevel::Division => &self.division,
            AddressLevel::District => &self.district,
            AddressLevel::Ward => &self.ward,
            AddressLevel::Area => &self.area,
        }
    }

    /// "Area, Ward, District, Division", skipping blanks.
    pub fn display_name(&self) -> String {
        [&self.area, &self.ward, &self.district, &self.division]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A partial selection. Deeper levels are only ever set when all
/// shallower levels are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSelection {
    values: [Option<String>; 4],
}

impl AddressSelection {
    pub fn get(&self, level: AddressLevel) -> Option<&str> {
        self.values[level.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Case-insensitive match of every selected level against `address`.
    pub fn matches(&self, address: &Address) -> bool {
        AddressLevel::ALL.iter().all(|&level| match self.get(level) {
            None => true,
            Some(want) => address.get(level).eq_ignore_ascii_case(want),
        })
    }

    fn set(&mut self, level: AddressLevel, value: Option<String>) {
        self.values[level.index()] = value;
        for deeper in &mut self.values[level.index() + 1..] {
            *deeper = None;
        }
    }
}

/// A lookup the caller must perform and feed back via [`AddressFilter::apply_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsRequest {
    pub level: AddressLevel,
    /// Selected value of the parent level; `None` only for divisions.
    pub parent: Option<String>,
    pub token: u64,
}

#[derive(Debug, Clone, Default)]
struct LevelState {
    options: Vec<String>,
    /// Token of the newest outstanding request, if any.
    pending: Option<u64>,
}

/// Dependent-dropdown state for the four address levels.
#[derive(Debug, Clone, Default)]
pub struct AddressFilter {
    selection: AddressSelection,
    levels: [LevelState; 4],
    next_token: u64,
}

impl AddressFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request for the top-level options. Call once when the filter mounts.
    pub fn bootstrap(&mut self) -> OptionsRequest {
        self.request(AddressLevel::Division, None)
    }

    pub fn selection(&self) -> &AddressSelection {
        &self.selection
    }

    pub fn options(&self, level: AddressLevel) -> &[String] {
        &self.levels[level.index()].options
    }

    pub fn is_loading(&self, level: AddressLevel) -> bool {
        self.levels[level.index()].pending.is_some()
    }

    /// A level can be chosen from once its parent is chosen.
    pub fn is_enabled(&self, level: AddressLevel) -> bool {
        match AddressLevel::ALL[..level.index()].last() {
            None => true,
            Some(&parent) => self.selection.get(parent).is_some(),
        }
    }

    /// Select (or clear, with `None`) a value at `level`.
    ///
    /// Clears the selection and options of every deeper level, invalidating
    /// their outstanding lookups. Returns the lookup for the next level when
    /// a value was chosen.
    pub fn select(&mut self, level: AddressLevel, value: Option<String>) -> Option<OptionsRequest> {
        let value = value.filter(|v| !v.is_empty());
        self.selection.set(level, value.clone());
        for deeper in &mut self.levels[level.index() + 1..] {
            *deeper = LevelState::default();
        }
        let child = level.child()?;
        let parent = value?;
        Some(self.request(child, Some(parent)))
    }

    /// Install options for a lookup. Returns `false` (and changes nothing)
    /// if a newer lookup for the same level has been issued since.
    pub fn apply_options(&mut self, token: u64, mut options: Vec<String>) -> bool {
        let Some(level) = self.level_for(token) else {
            return false;
        };
        options.retain(|o| !o.is_empty());
        options.dedup();
        let state = &mut self.levels[level.index()];
        state.options = options;
        state.pending = None;
        true
    }

    /// Mark a lookup as finished without options. Stale tokens are ignored.
    pub fn fail_options(&mut self, token: u64) -> bool {
        let Some(level) = self.level_for(token) else {
            return false;
        };
        self.levels[level.index()].pending = None;
        true
    }

    /// Clear every level and start over from divisions.
    pub fn reset(&mut self) -> OptionsRequest {
        let divisions = std::mem::take(&mut self.levels[0].options);
        self.selection = AddressSelection::default();
        self.levels = Default::default();
        self.levels[0].options = divisions;
        self.request(AddressLevel::Division, None)
    }

    fn level_for(&self, token: u64) -> Option<AddressLevel> {
        AddressLevel::ALL
            .iter()
            .copied()
            .find(|level| self.levels[level.index()].pending == Some(token))
    }

    fn request(&mut self, level: AddressLevel, parent: Option<String>) -> OptionsRequest {
        self.next_token += 1;
        let token = self.next_token;
        self.levels[level.index()].pending = Some(token);
        OptionsRequest {
            level,
            parent,
            token,
        }
    }
}

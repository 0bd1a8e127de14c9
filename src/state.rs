//! Reactive banner state.
//!
//! [`BannerStore`] holds the four fields of [`BannerState`] and records which
//! of them changed since the playground last propagated. Each field has one
//! writer: the control panel sets variant and theme, the live preview's
//! change observer commits text, and the height oracle publishes height.
//! Writes that do not change the value are dropped, so echoes never trigger
//! another propagation.

use std::fmt;

use bitflags::bitflags;

use crate::template::Height;
use crate::variant::{Theme, Variant};

bitflags! {
    /// Fields touched since the last propagation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Changes: u8 {
        const TEXT = 1 << 0;
        const VARIANT = 1 << 1;
        const THEME = 1 << 2;
        const HEIGHT = 1 << 3;
    }
}

impl Changes {
    /// Changes that require a new height measurement.
    pub const REMEASURE: Self = Self::TEXT.union(Self::VARIANT);
}

/// The banner being edited.
#[derive(Clone, Debug, PartialEq)]
pub struct BannerState {
    /// Inner HTML of the editable text node.
    pub text: String,
    pub variant: Variant,
    pub theme: Theme,
    /// Last measured height. `Px(0.0)` until the first measurement lands.
    pub height: Height,
}

impl BannerState {
    #[must_use]
    pub fn new(text: impl Into<String>, variant: Variant, theme: Theme) -> Self {
        Self {
            text: text.into(),
            variant,
            theme,
            height: Height::default(),
        }
    }
}

/// Per-field count of effective writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub text: u64,
    pub variant: u64,
    pub theme: u64,
    pub height: u64,
}

/// Handle returned by [`BannerStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&BannerState, Changes)>;

/// Owner of [`BannerState`].
pub struct BannerStore {
    state: BannerState,
    pending: Changes,
    writes: WriteCounts,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for BannerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BannerStore")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("writes", &self.writes)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl BannerStore {
    #[must_use]
    pub fn new(state: BannerState) -> Self {
        Self {
            state,
            pending: Changes::empty(),
            writes: WriteCounts::default(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &BannerState {
        &self.state
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.state.text
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.state.variant
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    #[must_use]
    pub fn height(&self) -> Height {
        self.state.height
    }

    #[must_use]
    pub fn writes(&self) -> WriteCounts {
        self.writes
    }

    /// Changes not yet propagated.
    #[must_use]
    pub fn pending(&self) -> Changes {
        self.pending
    }

    /// Take and clear the pending change set.
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.pending)
    }

    /// Select a variant. Returns whether the value changed.
    pub fn set_variant(&mut self, variant: Variant) -> bool {
        if self.state.variant == variant {
            return false;
        }
        self.state.variant = variant;
        self.writes.variant += 1;
        self.changed(Changes::VARIANT);
        true
    }

    /// Select a theme. Returns whether the value changed.
    pub fn set_theme(&mut self, theme: Theme) -> bool {
        if self.state.theme == theme {
            return false;
        }
        self.state.theme = theme;
        self.writes.theme += 1;
        self.changed(Changes::THEME);
        true
    }

    /// Commit text read back from the live surface.
    pub(crate) fn commit_text(&mut self, text: &str) -> bool {
        if self.state.text == text {
            return false;
        }
        text.clone_into(&mut self.state.text);
        self.writes.text += 1;
        self.changed(Changes::TEXT);
        true
    }

    /// Publish a measured height.
    pub(crate) fn publish_height(&mut self, height: Height) -> bool {
        if self.state.height == height {
            return false;
        }
        self.state.height = height;
        self.writes.height += 1;
        self.changed(Changes::HEIGHT);
        true
    }

    /// Register a callback invoked after every effective write.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&BannerState, Changes) + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn changed(&mut self, change: Changes) {
        self.pending |= change;
        for (_, callback) in &mut self.subscribers {
            callback(&self.state, change);
        }
    }
}

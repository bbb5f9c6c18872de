/// The notification indicator next to the account button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Badge {
    #[default]
    Hidden,
    /// Something is pending but everything on the chain was acknowledged.
    Dot,
    /// Number of unacknowledged transactions on the chain.
    Count(usize),
}

impl Badge {
    pub const fn from_counts(unchecked: usize, pending: usize) -> Self {
        if unchecked > 0 {
            Self::Count(unchecked)
        } else if pending > 0 {
            Self::Dot
        } else {
            Self::Hidden
        }
    }

    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

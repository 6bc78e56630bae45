/// Archive stage definitions
///
/// The crawl walks these stages strictly in order; each is gated by the
/// resume manifest when resuming is enabled.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiveStage {
    /// Fetch the docket's own details
    DocketDetails,

    /// Drain the docket's document listing
    DocumentList,

    /// Drain comment ids for every document
    CommentDiscovery,

    /// Fetch each comment and its attachments
    CommentDetail,

    /// Write the comment to attachment-path summary
    Finalize,
}

impl ArchiveStage {
    /// All stages in execution order
    pub const ALL: [ArchiveStage; 5] = [
        Self::DocketDetails,
        Self::DocumentList,
        Self::CommentDiscovery,
        Self::CommentDetail,
        Self::Finalize,
    ];

    /// Returns true if this stage issues API requests
    pub fn uses_network(&self) -> bool {
        !matches!(self, Self::Finalize)
    }

    /// Human-readable stage label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::DocketDetails => "docket details",
            Self::DocumentList => "document list",
            Self::CommentDiscovery => "comment discovery",
            Self::CommentDetail => "comment details and attachments",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for ArchiveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

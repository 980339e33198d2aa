/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    pub blocks_processed: u64,
    /// New rows only. Receipts already stored are not counted.
    pub receipts_persisted: u64,
    /// Last fully processed block.
    pub watermark: Option<u64>,
}

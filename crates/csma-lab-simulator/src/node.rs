use csma_lab_abstract::BackoffStrategy;
use rand::{Rng, RngCore};

/// One contender on the shared medium.
///
/// Created fresh for every trial and discarded at trial end; nothing
/// crosses trial boundaries. State machine: idle → counting down →
/// ready to transmit, until a successful transmission retires the node
/// for the rest of the trial.
#[derive(Debug)]
pub struct Node {
    packet_size: u32,
    backoff_remaining: u32,
    ready: bool,
}

impl Node {
    pub fn new() -> Self {
        Self {
            packet_size: 0,
            backoff_remaining: 0,
            ready: false,
        }
    }

    /// Draw a packet size for this trial and arm the node for step 0.
    /// Every node starts eligible; there is no initial random offset.
    pub fn randomize(&mut self, rng: &mut dyn RngCore, min_packet_size: u32, max_packet_size: u32) {
        self.packet_size = rng.random_range(min_packet_size..=max_packet_size);
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn packet_size(&self) -> u32 {
        self.packet_size
    }

    /// Successful transmission: the node holds a single packet per trial,
    /// so it never re-arms afterwards.
    pub fn complete_transmission(&mut self) {
        self.ready = false;
    }

    /// Draw a fresh backoff after a collision. The counters are the trial's
    /// cumulative totals, shared by every node caught in the same step.
    pub fn apply_backoff(
        &mut self,
        rng: &mut dyn RngCore,
        strategy: &mut dyn BackoffStrategy,
        collision_count: u32,
        successful_count: u32,
    ) {
        self.backoff_remaining = strategy.backoff_time(rng, collision_count, successful_count);
    }

    /// Advance one discrete step. A positive countdown is decremented and
    /// the node re-arms exactly when it hits zero. A drawn backoff of zero
    /// never enters the countdown, so that node stays ready for the next
    /// step.
    pub fn advance_one_step(&mut self) {
        if self.backoff_remaining > 0 {
            self.backoff_remaining -= 1;
            self.ready = self.backoff_remaining == 0;
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

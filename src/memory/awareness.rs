//! Awareness: short-term and long-term interaction tiers

use std::collections::VecDeque;
use crate::config::Attention;
use crate::memory::interaction::Interaction;

/// Both tiers are kept oldest first. Overflow of the short-term tier moves into long-term.
#[derive(Debug, Clone, Default)]
pub struct Awareness {
    attention: Attention,
    short: VecDeque<Interaction>,
    long: Vec<Interaction>,
}

impl Awareness {
    pub fn new(attention: Attention) -> Self { Self { attention, ..Default::default() } }

    pub fn add(&mut self, interaction: Interaction) -> &mut Self {
        self.short.push_back(interaction);
        if let Some(limit) = self.attention.limit() {
            while self.short.len() > limit {
                match self.short.pop_front() {
                    Some(oldest) => self.long.push(oldest),
                    None => break,
                }
            }
        }
        self
    }

    pub fn attention(&self) -> Attention { self.attention }
    pub fn short_term(&self) -> impl DoubleEndedIterator<Item = &Interaction> { self.short.iter() }
    pub fn long_term(&self) -> &[Interaction] { &self.long }
    pub fn len(&self) -> usize { self.short.len() + self.long.len() }
    pub fn is_empty(&self) -> bool { self.short.is_empty() && self.long.is_empty() }

    /// Short-term interactions, latest first
    pub fn cognitions(&self) -> impl Iterator<Item = &Interaction> { self.short.iter().rev() }

    /// Everything, latest first
    pub fn history(&self) -> impl Iterator<Item = &Interaction> { self.short.iter().rev().chain(self.long.iter().rev()) }
}

//! Page extension traits for EventPage and CommandPage.

use crate::proto::{event_page, CommandPage, EventPage, MergeStrategy};

pub trait EventPageExt {
    /// Sequence number carried on this page, or 0 for a force-applied or
    /// unsequenced page.
    fn sequence_num(&self) -> u32;
    fn type_url(&self) -> Option<&str>;
    fn payload(&self) -> Option<&[u8]>;

    /// Decode the event payload as `M`, if present and its type URL ends
    /// with `type_suffix`. Returns `None` rather than an error on any
    /// mismatch or decode failure.
    fn decode<M: prost::Message + Default>(&self, type_suffix: &str) -> Option<M>;
}

impl EventPageExt for EventPage {
    fn sequence_num(&self) -> u32 {
        match self.sequence {
            Some(event_page::Sequence::Num(n)) => n,
            _ => 0,
        }
    }

    fn type_url(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.type_url.as_str())
    }

    fn payload(&self) -> Option<&[u8]> {
        self.event.as_ref().map(|e| e.value.as_slice())
    }

    fn decode<M: prost::Message + Default>(&self, type_suffix: &str) -> Option<M> {
        let event = self.event.as_ref()?;
        if !event.type_url.ends_with(type_suffix) {
            return None;
        }
        M::decode(event.value.as_slice()).ok()
    }
}

pub trait CommandPageExt {
    fn sequence_num(&self) -> u32;
    fn type_url(&self) -> Option<&str>;
    fn payload(&self) -> Option<&[u8]>;
    fn decode<M: prost::Message + Default>(&self, type_suffix: &str) -> Option<M>;
    fn merge_strategy(&self) -> MergeStrategy;
}

impl CommandPageExt for CommandPage {
    fn sequence_num(&self) -> u32 {
        self.sequence
    }

    fn type_url(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.type_url.as_str())
    }

    fn payload(&self) -> Option<&[u8]> {
        self.command.as_ref().map(|c| c.value.as_slice())
    }

    fn decode<M: prost::Message + Default>(&self, type_suffix: &str) -> Option<M> {
        let command = self.command.as_ref()?;
        if !command.type_url.ends_with(type_suffix) {
            return None;
        }
        M::decode(command.value.as_slice()).ok()
    }

    fn merge_strategy(&self) -> MergeStrategy {
        MergeStrategy::try_from(self.merge_strategy).unwrap_or(MergeStrategy::MergeCommutative)
    }
}

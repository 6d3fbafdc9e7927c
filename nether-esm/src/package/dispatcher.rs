use crate::dialect::Dialect;
use crate::error::{EsmError, Result, Warning};
use crate::fixed::read_fixed;
use crate::string::decode_string;
use crate::tag::{Tag, tags};

use super::{BehaviorPackage, BehaviorPackageGroup};

/// Whether a `CNDT` subrecord may attach right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// Index of the follow/escort package awaiting its cell name
    PendingAttachment(usize),
}

/// Builds a [`BehaviorPackageGroup`] from package subrecords as they stream by.
///
/// The owning record decoder hands every package tag (`AI_*`, `CNDT`) to
/// [`dispatch`](Self::dispatch) and reports every other subrecord through
/// [`interrupt`](Self::interrupt), since a cell name only binds to the
/// package immediately before it.
#[derive(Debug)]
pub struct PackageDispatcher {
    record: Tag,
    group: BehaviorPackageGroup,
    state: DispatchState,
    previous: Option<Tag>,
}

impl PackageDispatcher {
    pub fn new(record: Tag) -> Self {
        Self {
            record,
            group: BehaviorPackageGroup::new(),
            state: DispatchState::Idle,
            previous: None,
        }
    }

    /// Tags handled by [`dispatch`](Self::dispatch)
    pub fn handles(tag: Tag) -> bool {
        matches!(
            tag,
            tags::AI_W | tags::AI_T | tags::AI_F | tags::AI_E | tags::AI_A | tags::CNDT
        )
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Decode one package or attachment subrecord
    pub fn dispatch(
        &mut self,
        tag: Tag,
        payload: &[u8],
        dialect: Dialect,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let package = match tag {
            tags::AI_W => BehaviorPackage::Wander(read_fixed(payload, tag, warnings)?),
            tags::AI_T => BehaviorPackage::Travel(read_fixed(payload, tag, warnings)?),
            tags::AI_F => BehaviorPackage::Follow(read_fixed(payload, tag, warnings)?),
            tags::AI_E => BehaviorPackage::Escort(read_fixed(payload, tag, warnings)?),
            tags::AI_A => BehaviorPackage::Activate(read_fixed(payload, tag, warnings)?),
            tags::CNDT => return self.attach(payload, dialect),
            _ => {
                return Err(EsmError::UnexpectedTag {
                    record: self.record,
                    tag,
                });
            }
        };

        let takes_attachment = matches!(
            package,
            BehaviorPackage::Follow(_) | BehaviorPackage::Escort(_)
        );
        let index = self.group.push(package);
        self.state = if takes_attachment {
            DispatchState::PendingAttachment(index)
        } else {
            DispatchState::Idle
        };
        self.previous = Some(tag);
        tracing::trace!(record = %self.record, %tag, index, "behavior package");
        Ok(())
    }

    /// Bind a `CNDT` cell name to the pending follow/escort package
    pub fn attach(&mut self, payload: &[u8], dialect: Dialect) -> Result<()> {
        let misplaced = EsmError::MisplacedAttachment {
            tag: tags::CNDT,
            previous: self.previous,
        };
        let DispatchState::PendingAttachment(index) = self.state else {
            return Err(misplaced);
        };
        let Some(slot) = self
            .group
            .get_mut(index)
            .and_then(BehaviorPackage::cell_name_slot)
        else {
            return Err(misplaced);
        };
        *slot = Some(decode_string(payload, tags::CNDT, dialect)?);
        self.state = DispatchState::Idle;
        self.previous = Some(tags::CNDT);
        Ok(())
    }

    /// Note a non-package subrecord: any pending attachment is abandoned
    pub fn interrupt(&mut self, tag: Tag) {
        self.state = DispatchState::Idle;
        self.previous = Some(tag);
    }

    /// Finish the record. A follow/escort still waiting for its cell name
    /// simply has none.
    pub fn finish(self) -> BehaviorPackageGroup {
        self.group
    }
}

//! Actions: the only way agents and tasks touch the world
//!
//! An [`Action`] is an immutable request. Performing it yields an [`ActionValue`] or an
//! [`ActionError`]; the pair of request and (possibly absent) result is an [`ActionOutcome`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vsrsim_geometry::{DoubleRange, Point, Poly};

use crate::body::{Material, Side};
use crate::engine::ActionPerformer;
use crate::ids::{AgentId, AnchorId, BodyId};
use crate::topology::{Link, LinkType};

/// Range of sensed voxel area ratios
pub const AREA_RATIO_RANGE: DoubleRange = DoubleRange { min: 0.5, max: 1.5 };

/// Range of sensed velocity components
pub const VELOCITY_RANGE: DoubleRange = DoubleRange { min: -5.0, max: 5.0 };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    // Body creation
    CreateVoxel {
        side_length: f64,
        mass: f64,
        material: Material,
    },
    CreateRigidBody {
        poly: Poly,
        mass: f64,
        /// Pinned bodies only rotate around this point
        pivot: Option<Point>,
    },
    CreateUnmovableBody {
        poly: Poly,
    },

    // Placement
    TranslateBody {
        body: BodyId,
        translation: Point,
    },
    TranslateAgent {
        agent: AgentId,
        translation: Point,
    },

    // Agents
    AddAgent {
        agent: AgentId,
    },
    AddAndTranslateAgent {
        agent: AgentId,
        translation: Point,
    },

    // Actuation and structure
    ActuateVoxel {
        body: BodyId,
        /// One value per side, indexed by `Side::index`
        values: [f64; 4],
    },
    CreateLink {
        source: AnchorId,
        target: AnchorId,
        kind: LinkType,
    },
    AttractAndLinkClosestAnchorable {
        anchors: Vec<AnchorId>,
        link_count: usize,
        kind: LinkType,
    },
    DetachAnchors {
        anchors: Vec<AnchorId>,
    },

    // Sensing
    SenseAreaRatio {
        body: BodyId,
    },
    SenseVelocity {
        body: BodyId,
        /// Angle of the axis the velocity is projected on
        direction: f64,
    },
    SenseContact {
        body: BodyId,
    },
    SenseSideAttachment {
        body: BodyId,
        side: Side,
    },
    SenseSideCompression {
        body: BodyId,
        side: Side,
    },
    SenseNfc {
        body: BodyId,
        /// Receiver position relative to the body center
        displacement: Point,
        direction: f64,
        channel: usize,
    },

    // Messaging
    EmitNfcMessage {
        body: BodyId,
        displacement: Point,
        direction: f64,
        channel: usize,
        value: f64,
    },
}

impl Action {
    /// Actuate all four sides of `body` with the same value
    pub fn actuate_uniform(body: BodyId, value: f64) -> Self {
        Self::actuate(body, [value; 4])
    }

    /// Actuate `body`, clipping every value into [-1, 1]
    pub fn actuate(body: BodyId, values: [f64; 4]) -> Self {
        Action::ActuateVoxel {
            body,
            values: values.map(|v| DoubleRange::SYMMETRIC_UNIT.clip(v)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateVoxel { .. } => "CreateVoxel",
            Action::CreateRigidBody { .. } => "CreateRigidBody",
            Action::CreateUnmovableBody { .. } => "CreateUnmovableBody",
            Action::TranslateBody { .. } => "TranslateBody",
            Action::TranslateAgent { .. } => "TranslateAgent",
            Action::AddAgent { .. } => "AddAgent",
            Action::AddAndTranslateAgent { .. } => "AddAndTranslateAgent",
            Action::ActuateVoxel { .. } => "ActuateVoxel",
            Action::CreateLink { .. } => "CreateLink",
            Action::AttractAndLinkClosestAnchorable { .. } => "AttractAndLinkClosestAnchorable",
            Action::DetachAnchors { .. } => "DetachAnchors",
            Action::SenseAreaRatio { .. } => "SenseAreaRatio",
            Action::SenseVelocity { .. } => "SenseVelocity",
            Action::SenseContact { .. } => "SenseContact",
            Action::SenseSideAttachment { .. } => "SenseSideAttachment",
            Action::SenseSideCompression { .. } => "SenseSideCompression",
            Action::SenseNfc { .. } => "SenseNfc",
            Action::EmitNfcMessage { .. } => "EmitNfcMessage",
        }
    }

    pub fn is_sense(&self) -> bool {
        matches!(
            self,
            Action::SenseAreaRatio { .. }
                | Action::SenseVelocity { .. }
                | Action::SenseContact { .. }
                | Action::SenseSideAttachment { .. }
                | Action::SenseSideCompression { .. }
                | Action::SenseNfc { .. }
        )
    }

    /// Interval bounding the numeric payload or result of this action, if it has one
    pub fn range(&self) -> Option<DoubleRange> {
        match self {
            Action::ActuateVoxel { .. } => Some(DoubleRange::SYMMETRIC_UNIT),
            Action::EmitNfcMessage { .. } => Some(DoubleRange::SYMMETRIC_UNIT),
            Action::SenseAreaRatio { .. } => Some(AREA_RATIO_RANGE),
            Action::SenseSideCompression { .. } => Some(AREA_RATIO_RANGE),
            Action::SenseVelocity { .. } => Some(VELOCITY_RANGE),
            Action::SenseContact { .. } => Some(DoubleRange::UNIT),
            Action::SenseSideAttachment { .. } => Some(DoubleRange::UNIT),
            Action::SenseNfc { .. } => Some(DoubleRange::SYMMETRIC_UNIT),
            _ => None,
        }
    }

    /// Whether this action is carried out by issuing sub-actions through the performer
    pub fn is_self_described(&self) -> bool {
        matches!(self, Action::AddAndTranslateAgent { .. })
    }

    /// Decompose a self-described action into sub-actions issued through `performer`
    ///
    /// Fails with an error citing `self` when a required sub-outcome is absent or a
    /// sub-action fails. Undoing the sub-actions already done is up to the performer.
    pub fn perform_self_described(
        &self,
        performer: &mut dyn ActionPerformer,
        agent: Option<AgentId>,
    ) -> Result<ActionValue, ActionError> {
        match self {
            Action::AddAndTranslateAgent {
                agent: added,
                translation,
            } => {
                let outcome = performer.perform_logged(Action::AddAgent { agent: *added }, agent);
                let id = outcome
                    .outcome
                    .as_ref()
                    .and_then(ActionValue::as_agent)
                    .ok_or_else(|| ActionError::new(self.clone(), "Undoable addition"))?;
                performer
                    .perform(
                        &Action::TranslateAgent {
                            agent: id,
                            translation: *translation,
                        },
                        agent,
                    )
                    .map_err(|e| {
                        ActionError::new(self.clone(), format!("Untranslatable agent: {}", e.reason))
                    })?;
                Ok(ActionValue::Agent(id))
            }
            other => Err(ActionError::new(other.clone(), "not a self-described action")),
        }
    }
}

/// Result of a successful action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionValue {
    /// Done, nothing to report
    Unit,
    Scalar(f64),
    Body(BodyId),
    Agent(AgentId),
    /// Links created or removed by the action
    Links(Vec<Link>),
}

impl ActionValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ActionValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_body(&self) -> Option<BodyId> {
        match self {
            ActionValue::Body(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_agent(&self) -> Option<AgentId> {
        match self {
            ActionValue::Agent(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_links(&self) -> Option<&[Link]> {
        match self {
            ActionValue::Links(links) => Some(links),
            _ => None,
        }
    }
}

/// An action paired with the agent that issued it and its result; `outcome` is `None` on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: Action,
    pub agent: Option<AgentId>,
    pub outcome: Option<ActionValue>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome.is_some()
    }

    /// Scalar result of a sense action
    pub fn sensed(&self) -> Option<f64> {
        self.outcome.as_ref().and_then(ActionValue::as_scalar)
    }
}

/// An action could not be carried out
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} failed: {reason}", .action.name())]
pub struct ActionError {
    pub action: Box<Action>,
    pub reason: String,
}

impl ActionError {
    pub fn new(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action: Box::new(action),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuate_clips_values() {
        let action = Action::actuate(BodyId::from_raw(0), [2.0, -3.0, 0.5, 0.0]);
        assert_eq!(
            action,
            Action::ActuateVoxel {
                body: BodyId::from_raw(0),
                values: [1.0, -1.0, 0.5, 0.0],
            }
        );
    }

    #[test]
    fn test_sense_ranges() {
        let body = BodyId::from_raw(0);
        let contact = Action::SenseContact { body };
        assert!(contact.is_sense());
        assert_eq!(contact.range(), Some(DoubleRange::UNIT));
        let velocity = Action::SenseVelocity {
            body,
            direction: 0.0,
        };
        assert_eq!(velocity.range(), Some(DoubleRange::new(-5.0, 5.0)));
        assert!(!Action::actuate_uniform(body, 0.0).is_sense());
        assert_eq!(Action::CreateUnmovableBody { poly: Poly::new(vec![]) }.range(), None);
    }

    #[test]
    fn test_error_message_names_action() {
        let err = ActionError::new(
            Action::AddAgent {
                agent: AgentId::from_raw(2),
            },
            "unknown agent",
        );
        assert_eq!(err.to_string(), "AddAgent failed: unknown agent");
    }

    /// Adds any agent, but cannot move anything
    struct Stuck {
        performed: Vec<&'static str>,
    }

    impl ActionPerformer for Stuck {
        fn perform(&mut self, action: &Action, _agent: Option<AgentId>) -> Result<ActionValue, ActionError> {
            self.performed.push(action.name());
            match action {
                Action::AddAgent { agent } => Ok(ActionValue::Agent(*agent)),
                other => Err(ActionError::new(other.clone(), "bodies are frozen")),
            }
        }
    }

    #[test]
    fn test_failed_translation_fails_whole_addition() {
        let action = Action::AddAndTranslateAgent {
            agent: AgentId::from_raw(0),
            translation: Point::new(1.0, 0.0),
        };
        let mut performer = Stuck { performed: Vec::new() };
        let err = action.perform_self_described(&mut performer, None).unwrap_err();
        assert_eq!(*err.action, action);
        assert_eq!(err.reason, "Untranslatable agent: bodies are frozen");
        assert_eq!(performer.performed, vec!["AddAgent", "TranslateAgent"]);
    }
}

//! World state: body arena, attachment graph and message buffer
//!
//! The world performs every action that does not involve agents. Agent-level actions
//! need an [`Engine`](crate::engine::Engine), which knows which bodies belong to whom.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use vsrsim_geometry::{DoubleRange, Point};

use crate::action::{Action, ActionError, ActionValue};
use crate::body::{Body, RigidBody, Side, UnmovableBody, Voxel};
use crate::engine::{ActionPerformer, WorldAccess};
use crate::ids::{AgentId, AnchorId, BodyId};
use crate::kinematic::EngineConfig;
use crate::nfc::{NfcBuffer, NfcMessage};
use crate::topology::{AttachmentGraph, Link, LinkType};

pub struct World {
    pub(crate) bodies: Vec<Body>,
    /// Whether each body touched a support during the last step
    pub(crate) contacts: Vec<bool>,
    pub(crate) graph: AttachmentGraph,
    pub(crate) nfc: NfcBuffer,
    pub(crate) t: f64,
    pub(crate) config: EngineConfig,
}

impl World {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            bodies: Vec::new(),
            contacts: Vec::new(),
            graph: AttachmentGraph::new(),
            nfc: NfcBuffer::new(),
            t: 0.0,
            config,
        }
    }

    pub fn graph(&self) -> &AttachmentGraph {
        &self.graph
    }

    pub fn is_in_contact(&self, body: BodyId) -> bool {
        self.contacts.get(body.index()).copied().unwrap_or(false)
    }

    /// Connected groups of anchorable bodies
    pub fn assemblies(&self) -> Vec<Vec<BodyId>> {
        self.graph
            .assemblies(self.bodies.len())
            .into_iter()
            .filter(|group| {
                group
                    .iter()
                    .all(|id| self.bodies[id.index()].is_anchorable())
            })
            .collect()
    }

    fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId::from_raw(self.bodies.len() as u32);
        log::debug!("World: created {:?} {}", body.kind(), id);
        self.bodies.push(body);
        self.contacts.push(false);
        id
    }

    fn body_or_fail(&self, action: &Action, id: BodyId) -> Result<&Body, ActionError> {
        self.bodies
            .get(id.index())
            .ok_or_else(|| ActionError::new(action.clone(), format!("no such body {}", id)))
    }

    fn voxel_or_fail(&self, action: &Action, id: BodyId) -> Result<&Voxel, ActionError> {
        self.body_or_fail(action, id)?
            .as_voxel()
            .ok_or_else(|| ActionError::new(action.clone(), format!("{} is not a voxel", id)))
    }

    /// Drop every body created after the first `len`, together with their links
    pub(crate) fn truncate_bodies(&mut self, len: usize) {
        for i in (len..self.bodies.len()).rev() {
            self.graph.remove_body(BodyId::from_raw(i as u32));
        }
        if self.bodies.len() > len {
            log::debug!("World: removed {} bodies", self.bodies.len() - len);
        }
        self.bodies.truncate(len);
        self.contacts.truncate(len);
    }

    pub(crate) fn translate_body(&mut self, id: BodyId, delta: Point) -> bool {
        match self.bodies.get_mut(id.index()) {
            Some(body) => {
                body.translate(delta);
                true
            }
            None => false,
        }
    }

    /// Body whose closest anchor is nearest to `anchors`, within attach range
    ///
    /// Skips the anchors' own bodies and bodies already linked to them; ties go to the
    /// lowest id.
    fn closest_anchorable(&self, anchors: &[(AnchorId, Point)]) -> Option<BodyId> {
        let own: BTreeSet<BodyId> = anchors.iter().map(|(a, _)| a.body).collect();
        let ids: Vec<AnchorId> = anchors.iter().map(|(a, _)| *a).collect();
        let linked = self.graph.linked_bodies(&ids);
        let mut best: Option<(f64, BodyId)> = None;
        for (i, body) in self.bodies.iter().enumerate() {
            let id = BodyId::from_raw(i as u32);
            if !body.is_anchorable() || own.contains(&id) || linked.contains(&id) {
                continue;
            }
            let distance = (0..body.anchor_count() as u8)
                .filter_map(|k| body.anchor_point(k))
                .flat_map(|p| anchors.iter().map(move |(_, q)| p.distance(*q)))
                .fold(f64::INFINITY, f64::min);
            if distance > self.config.attach_range {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn attract_and_link(
        &mut self,
        action: &Action,
        anchors: &[AnchorId],
        link_count: usize,
        kind: LinkType,
    ) -> Result<ActionValue, ActionError> {
        let mut sources: Vec<(AnchorId, Point)> = Vec::new();
        for anchor in anchors {
            let point = self.anchor_point(*anchor).ok_or_else(|| {
                ActionError::new(action.clone(), format!("{} is not a valid anchor", anchor))
            })?;
            if sources.iter().all(|(a, _)| a != anchor) {
                sources.push((*anchor, point));
            }
        }
        let Some(target) = self.closest_anchorable(&sources) else {
            return Ok(ActionValue::Links(Vec::new()));
        };
        let target_body = &self.bodies[target.index()];
        let targets: Vec<(AnchorId, Point)> = target_body
            .anchors(target)
            .filter_map(|a| target_body.anchor_point(a.index).map(|p| (a, p)))
            .collect();

        let mut candidates: Vec<(f64, usize, usize)> = sources
            .iter()
            .enumerate()
            .flat_map(|(i, (_, p))| {
                targets
                    .iter()
                    .enumerate()
                    .map(move |(j, (_, q))| (p.distance(*q), i, j))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut used_sources = vec![false; sources.len()];
        let mut used_targets = vec![false; targets.len()];
        let mut created = Vec::new();
        for (_, i, j) in candidates {
            if created.len() >= link_count {
                break;
            }
            if used_sources[i] || used_targets[j] {
                continue;
            }
            match self.graph.link(sources[i].0, targets[j].0, kind) {
                Ok(link) => {
                    used_sources[i] = true;
                    used_targets[j] = true;
                    created.push(link);
                }
                Err(e) => log::warn!("World: skipping link: {}", e),
            }
        }
        log::debug!(
            "World: attached {} link(s) from {} anchor(s) to {}",
            created.len(),
            sources.len(),
            target
        );
        Ok(ActionValue::Links(created))
    }
}

impl WorldAccess for World {
    fn t(&self) -> f64 {
        self.t
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.index())
    }

    fn body_ids(&self) -> Vec<BodyId> {
        (0..self.bodies.len() as u32).map(BodyId::from_raw).collect()
    }

    fn anchor_point(&self, anchor: AnchorId) -> Option<Point> {
        self.bodies
            .get(anchor.body.index())
            .and_then(|b| b.anchor_point(anchor.index))
    }

    fn links_of(&self, anchor: AnchorId) -> Vec<Link> {
        self.graph.links_of(anchor)
    }

    fn links(&self) -> Vec<Link> {
        self.graph.links().collect()
    }
}

impl ActionPerformer for World {
    fn perform(&mut self, action: &Action, agent: Option<AgentId>) -> Result<ActionValue, ActionError> {
        let fail = |reason: &str| ActionError::new(action.clone(), reason);
        match action {
            Action::CreateVoxel {
                side_length,
                mass,
                material,
            } => {
                if *side_length <= 0.0 || *mass <= 0.0 {
                    return Err(fail("side length and mass must be positive"));
                }
                material
                    .validate()
                    .map_err(|e| ActionError::new(action.clone(), e.to_string()))?;
                let id = self.add_body(Body::Voxel(Voxel::new(*side_length, *mass, *material)));
                Ok(ActionValue::Body(id))
            }
            Action::CreateRigidBody { poly, mass, pivot } => {
                if poly.len() < 3 || *mass <= 0.0 {
                    return Err(fail("rigid bodies need at least 3 vertices and a positive mass"));
                }
                let id = self.add_body(Body::Rigid(RigidBody::new(poly.clone(), *mass, *pivot)));
                Ok(ActionValue::Body(id))
            }
            Action::CreateUnmovableBody { poly } => {
                if poly.len() < 3 {
                    return Err(fail("unmovable bodies need at least 3 vertices"));
                }
                let id = self.add_body(Body::Unmovable(UnmovableBody { poly: poly.clone() }));
                Ok(ActionValue::Body(id))
            }
            Action::TranslateBody { body, translation } => {
                self.body_or_fail(action, *body)?;
                self.translate_body(*body, *translation);
                Ok(ActionValue::Unit)
            }
            Action::ActuateVoxel { body, values } => {
                self.voxel_or_fail(action, *body)?;
                if let Some(Body::Voxel(voxel)) = self.bodies.get_mut(body.index()) {
                    voxel.actuation = values.map(|v| DoubleRange::SYMMETRIC_UNIT.clip(v));
                }
                Ok(ActionValue::Unit)
            }
            Action::CreateLink {
                source,
                target,
                kind,
            } => {
                for anchor in [source, target] {
                    if self.anchor_point(*anchor).is_none() {
                        return Err(ActionError::new(
                            action.clone(),
                            format!("{} is not a valid anchor", anchor),
                        ));
                    }
                }
                let link = self
                    .graph
                    .link(*source, *target, *kind)
                    .map_err(|e| ActionError::new(action.clone(), e.to_string()))?;
                Ok(ActionValue::Links(vec![link]))
            }
            Action::AttractAndLinkClosestAnchorable {
                anchors,
                link_count,
                kind,
            } => self.attract_and_link(action, anchors, *link_count, *kind),
            Action::DetachAnchors { anchors } => {
                let removed: Vec<Link> = anchors.iter().flat_map(|a| self.graph.detach(*a)).collect();
                Ok(ActionValue::Links(removed))
            }
            Action::SenseAreaRatio { body } => {
                let voxel = self.voxel_or_fail(action, *body)?;
                Ok(ActionValue::Scalar(voxel.area_ratio()))
            }
            Action::SenseVelocity { body, direction } => {
                let v = self.body_or_fail(action, *body)?.velocity();
                Ok(ActionValue::Scalar(v.x * direction.cos() + v.y * direction.sin()))
            }
            Action::SenseContact { body } => {
                self.body_or_fail(action, *body)?;
                let contact = if self.is_in_contact(*body) { 1.0 } else { 0.0 };
                Ok(ActionValue::Scalar(contact))
            }
            Action::SenseSideAttachment { body, side } => {
                self.body_or_fail(action, *body)?;
                let anchors: SmallVec<[AnchorId; 2]> = self.anchors_on(*body, *side);
                Ok(ActionValue::Scalar(self.graph.side_attachment_ratio(&anchors)))
            }
            Action::SenseSideCompression { body, side } => {
                let voxel = self.voxel_or_fail(action, *body)?;
                let ratio = voxel.side(*side).length() / voxel.rest_side_length();
                Ok(ActionValue::Scalar(ratio))
            }
            Action::SenseNfc {
                body,
                displacement,
                direction,
                channel,
            } => {
                let center = self.body_or_fail(action, *body)?.poly().center();
                let value = self.nfc.receive(
                    *body,
                    center + *displacement,
                    *direction,
                    *channel,
                    self.config.nfc_range,
                );
                Ok(ActionValue::Scalar(value))
            }
            Action::EmitNfcMessage {
                body,
                displacement,
                direction,
                channel,
                value,
            } => {
                let center = self.body_or_fail(action, *body)?.poly().center();
                self.nfc.emit(NfcMessage {
                    source: *body,
                    position: center + *displacement,
                    direction: *direction,
                    channel: *channel,
                    value: *value,
                });
                Ok(ActionValue::Unit)
            }
            Action::AddAndTranslateAgent { .. } => action.perform_self_described(self, agent),
            Action::AddAgent { .. } | Action::TranslateAgent { .. } => {
                Err(fail("agents can only be managed by an engine"))
            }
        }
    }
}

/// Side anchors helper used by agents that address voxel sides
pub fn side_anchors(body: BodyId, side: Side) -> Vec<AnchorId> {
    Voxel::anchors_on(body, side).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Material;

    fn world_with_voxels(centers: &[Point]) -> (World, Vec<BodyId>) {
        let mut world = World::new(EngineConfig::default());
        let ids = centers
            .iter()
            .map(|c| {
                let id = world
                    .perform(
                        &Action::CreateVoxel {
                            side_length: 1.0,
                            mass: 1.0,
                            material: Material::default(),
                        },
                        None,
                    )
                    .unwrap()
                    .as_body()
                    .unwrap();
                world
                    .perform(
                        &Action::TranslateBody {
                            body: id,
                            translation: *c,
                        },
                        None,
                    )
                    .unwrap();
                id
            })
            .collect();
        (world, ids)
    }

    #[test]
    fn test_create_voxel_rejects_bad_material() {
        let mut world = World::new(EngineConfig::default());
        let action = Action::CreateVoxel {
            side_length: 1.0,
            mass: 1.0,
            material: Material::with_delta(0.5, 0.2).unwrap(),
        };
        assert!(world.perform(&action, None).is_ok());
        let bad = Action::CreateVoxel {
            side_length: -1.0,
            mass: 1.0,
            material: Material::default(),
        };
        assert!(world.perform(&bad, None).is_err());
        assert_eq!(world.body_ids().len(), 1);
    }

    #[test]
    fn test_attract_links_closest_body() {
        let (mut world, ids) = world_with_voxels(&[
            Point::new(0.0, 0.0),
            Point::new(1.1, 0.0),
            Point::new(-1.3, 0.0),
        ]);
        let anchors = side_anchors(ids[0], Side::E);
        let result = world
            .perform(
                &Action::AttractAndLinkClosestAnchorable {
                    anchors: anchors.clone(),
                    link_count: 2,
                    kind: LinkType::Rigid,
                },
                None,
            )
            .unwrap();
        let links = result.as_links().unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.source.body == ids[0] && l.target.body == ids[1]));
        // east side corners pair with the west side corners of the neighbour
        assert_eq!(world.graph().side_attachment_ratio(&anchors), 1.0);
        assert_eq!(
            world
                .graph()
                .side_attachment_ratio(&side_anchors(ids[1], Side::W)),
            1.0
        );
    }

    #[test]
    fn test_attract_is_idempotent_when_saturated() {
        let (mut world, ids) = world_with_voxels(&[Point::new(0.0, 0.0), Point::new(1.1, 0.0)]);
        let attract = Action::AttractAndLinkClosestAnchorable {
            anchors: side_anchors(ids[0], Side::E),
            link_count: 2,
            kind: LinkType::Soft,
        };
        world.perform(&attract, None).unwrap();
        assert_eq!(world.graph().len(), 2);
        for _ in 0..3 {
            let result = world.perform(&attract, None).unwrap();
            assert_eq!(result.as_links().map(|l| l.len()), Some(0));
            assert_eq!(world.graph().len(), 2);
        }
    }

    #[test]
    fn test_attract_without_candidates_succeeds() {
        let (mut world, ids) = world_with_voxels(&[Point::new(0.0, 0.0), Point::new(50.0, 0.0)]);
        let result = world
            .perform(
                &Action::AttractAndLinkClosestAnchorable {
                    anchors: side_anchors(ids[0], Side::E),
                    link_count: 2,
                    kind: LinkType::Soft,
                },
                None,
            )
            .unwrap();
        assert_eq!(result, ActionValue::Links(Vec::new()));
    }

    #[test]
    fn test_detach_is_symmetric_and_idempotent() {
        let (mut world, ids) = world_with_voxels(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let east = side_anchors(ids[0], Side::E);
        world
            .perform(
                &Action::AttractAndLinkClosestAnchorable {
                    anchors: east.clone(),
                    link_count: 2,
                    kind: LinkType::Rigid,
                },
                None,
            )
            .unwrap();
        let detach = Action::DetachAnchors { anchors: east };
        let removed = world.perform(&detach, None).unwrap();
        assert_eq!(removed.as_links().map(|l| l.len()), Some(2));
        for anchor in side_anchors(ids[1], Side::W) {
            assert!(world.links_of(anchor).is_empty());
        }
        let again = world.perform(&detach, None).unwrap();
        assert_eq!(again, ActionValue::Links(Vec::new()));
        assert!(world.graph().is_consistent());
    }

    #[test]
    fn test_sense_side_attachment_on_unattached_side() {
        let (mut world, ids) = world_with_voxels(&[Point::new(0.0, 0.0)]);
        let value = world
            .perform(
                &Action::SenseSideAttachment {
                    body: ids[0],
                    side: Side::N,
                },
                None,
            )
            .unwrap();
        assert_eq!(value, ActionValue::Scalar(0.0));
    }

    #[test]
    fn test_agent_actions_need_an_engine() {
        let mut world = World::new(EngineConfig::default());
        let err = world
            .perform(
                &Action::AddAndTranslateAgent {
                    agent: AgentId::from_raw(0),
                    translation: Point::ZERO,
                },
                None,
            )
            .unwrap_err();
        assert_eq!(err.reason, "Undoable addition");
        assert!(matches!(*err.action, Action::AddAndTranslateAgent { .. }));
    }

    #[test]
    fn test_actuation_is_clipped_and_sensed() {
        let (mut world, ids) = world_with_voxels(&[Point::ZERO]);
        world
            .perform(
                &Action::ActuateVoxel {
                    body: ids[0],
                    values: [3.0; 4],
                },
                None,
            )
            .unwrap();
        let voxel = world.body(ids[0]).and_then(Body::as_voxel).unwrap();
        assert_eq!(voxel.actuation(), [1.0; 4]);
        let sensed = world
            .perform(&Action::SenseAreaRatio { body: ids[0] }, None)
            .unwrap();
        assert_eq!(sensed, ActionValue::Scalar(1.0));
    }
}

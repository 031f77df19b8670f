//! Arena of components and links.
//!
//! Components and links refer to each other by index, so a layout can be
//! thrown away as a whole on rebuild.

use std::collections::BTreeMap;

use super::link::{ComponentId, Direction, Link, LinkId};
use crate::{
    error::SimError,
    isa::BitField,
    units::{logic::unary, StepContext, Unit, UnitKind},
};

/// A node of the datapath: one unit plus its links and display geometry.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) name: &'static str,
    pub(crate) unit: Unit,
    pub(crate) links: BTreeMap<u8, LinkId>,
    pub(crate) stage: u8,
    pub(crate) position: (u32, u32),
    pub(crate) size: (u32, u32),
    pub(crate) active: bool,
    pub(crate) pending_active: bool,
}

impl Component {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn kind(&self) -> UnitKind {
        self.unit.kind()
    }
    pub fn unit(&self) -> &Unit {
        &self.unit
    }
    /// Pipeline stage, 0 (fetch) to 4 (write back).
    pub fn stage(&self) -> u8 {
        self.stage
    }
    pub fn position(&self) -> (u32, u32) {
        self.position
    }
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
    pub fn is_active(&self) -> bool {
        self.active
    }
    pub fn slots(&self) -> impl Iterator<Item = u8> + '_ {
        self.links.keys().copied()
    }
    fn is_junction(&self) -> bool {
        matches!(self.unit, Unit::Junction)
    }
}

/// The links of one component as seen from inside its step function.
pub struct Ports<'a> {
    id: ComponentId,
    links: &'a mut [Link],
    map: &'a BTreeMap<u8, LinkId>,
}

impl Ports<'_> {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Value of a slot. Missing slots read as 0.
    pub fn get(&self, slot: u8) -> u32 {
        self.map
            .get(&slot)
            .map(|l| self.links[l.0].value())
            .unwrap_or_default()
    }

    pub fn set(&mut self, slot: u8, value: u32) {
        if let Some(l) = self.map.get(&slot) {
            self.links[l.0].value = value;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Circuit {
    pub(crate) components: Vec<Component>,
    pub(crate) links: Vec<Link>,
}

impl Circuit {
    pub fn add(
        &mut self,
        name: &'static str,
        unit: Unit,
        stage: u8,
        position: (u32, u32),
        size: (u32, u32),
    ) -> ComponentId {
        let id = ComponentId(self.components.len());
        let mut links = BTreeMap::new();
        for port in unit.ports() {
            let link = LinkId(self.links.len());
            self.links
                .push(Link::new(id, port.slot, port.direction, port.field));
            links.insert(port.slot, link);
        }
        self.components.push(Component {
            name,
            unit,
            links,
            stage,
            position,
            size,
            active: false,
            pending_active: false,
        });
        id
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component, SimError> {
        self.components
            .get(id.0)
            .ok_or(SimError::NoSuchComponent(id.0))
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component, SimError> {
        self.components
            .get_mut(id.0)
            .ok_or(SimError::NoSuchComponent(id.0))
    }

    pub fn link_id(&self, id: ComponentId, slot: u8) -> Result<LinkId, SimError> {
        self.component(id)?
            .links
            .get(&slot)
            .copied()
            .ok_or(SimError::NoSuchLink {
                component: id.0,
                slot,
            })
    }

    pub fn link(&self, id: ComponentId, slot: u8) -> Result<&Link, SimError> {
        Ok(&self.links[self.link_id(id, slot)?.0])
    }

    /// Wire output `out` of `from` to input `to_slot` of `to`. `field`
    /// replaces the input's default bit field when given.
    pub fn connect(
        &mut self,
        from: ComponentId,
        out: u8,
        to: ComponentId,
        to_slot: u8,
        field: Option<BitField>,
    ) -> Result<(), SimError> {
        let src = self.link_id(from, out)?;
        let dst = self.link_id(to, to_slot)?;
        if self.links[src.0].direction != Direction::Output {
            return Err(SimError::NoSuchLink {
                component: from.0,
                slot: out,
            });
        }
        if self.links[dst.0].direction != Direction::Input {
            return Err(SimError::NoSuchLink {
                component: to.0,
                slot: to_slot,
            });
        }
        let sink = &mut self.links[dst.0];
        sink.source = Some(src);
        if field.is_some() {
            sink.field = field;
        }
        self.links[src.0].sinks.push(dst);
        Ok(())
    }

    /// Tie an unconnected input to a fixed value. Constant inputs count as
    /// active.
    pub fn set_constant(&mut self, to: ComponentId, slot: u8, value: u32) -> Result<(), SimError> {
        let id = self.link_id(to, slot)?;
        let link = &mut self.links[id.0];
        link.value = value;
        link.active = true;
        Ok(())
    }

    /// The output link an input ultimately reads from, looking through
    /// junctions.
    pub fn resolve(&self, input: LinkId) -> Option<LinkId> {
        let mut src = self.links[input.0].source?;
        // a junction chain can be no longer than the component count
        for _ in 0..=self.components.len() {
            let owner = &self.components[self.links[src.0].owner.0];
            if !owner.is_junction() {
                return Some(src);
            }
            let junction_in = owner.links.get(&unary::IN)?;
            src = self.links[junction_in.0].source?;
        }
        None
    }

    /// Copy every connected output into the inputs reading from it. Junction
    /// outputs mirror their resolved source as well.
    pub fn pull_inputs(&mut self) {
        let updates: Vec<(usize, u32)> = (0..self.links.len())
            .filter_map(|i| {
                let link = &self.links[i];
                let input = match link.direction {
                    Direction::Input => LinkId(i),
                    Direction::Output => {
                        let owner = &self.components[link.owner.0];
                        if !owner.is_junction() {
                            return None;
                        }
                        *owner.links.get(&unary::IN)?
                    }
                };
                self.resolve(input)
                    .map(|src| (i, self.links[src.0].value))
            })
            .collect();
        for (i, value) in updates {
            self.links[i].value = value;
        }
    }

    /// Activity of a link. Connected inputs follow the component driving
    /// them; outputs follow their owner.
    pub fn link_active(&self, id: LinkId) -> bool {
        let link = &self.links[id.0];
        match link.direction {
            Direction::Output => self.components[link.owner.0].active,
            Direction::Input => match link.source {
                Some(_) => self
                    .resolve(id)
                    .map(|src| self.components[self.links[src.0].owner.0].active)
                    .unwrap_or(false),
                None => link.active,
            },
        }
    }

    pub fn set_link_active(&mut self, id: LinkId, active: bool) {
        let link = &mut self.links[id.0];
        match link.direction {
            Direction::Input => link.active = active,
            Direction::Output => {
                let owner = &mut self.components[link.owner.0];
                owner.active = active;
                owner.pending_active = active;
            }
        }
    }

    /// Whether the inputs that gate activation of `id` are all active.
    pub fn inputs_active(&self, id: ComponentId) -> bool {
        let c = &self.components[id.0];
        match c.unit.activation_slots() {
            Some(slots) => slots
                .iter()
                .filter_map(|s| c.links.get(s))
                .all(|l| self.link_active(*l)),
            None => c
                .links
                .values()
                .filter(|l| self.links[l.0].direction == Direction::Input)
                .all(|l| self.link_active(*l)),
        }
    }

    /// Step every non-junction component once, in insertion order.
    pub fn step_all(&mut self, ctx: &StepContext) -> Result<(), SimError> {
        let Circuit { components, links } = self;
        for (i, c) in components.iter_mut().enumerate() {
            if c.is_junction() {
                continue;
            }
            let mut io = Ports {
                id: ComponentId(i),
                links: links.as_mut_slice(),
                map: &c.links,
            };
            c.unit.step(&mut io, ctx)?;
        }
        Ok(())
    }

    /// Mark components whose gating inputs are active as pending.
    pub fn update_pending(&mut self) {
        let ready: Vec<usize> = (0..self.components.len())
            .filter(|&i| {
                let c = &self.components[i];
                !c.is_junction() && !c.active && self.inputs_active(ComponentId(i))
            })
            .collect();
        for i in ready {
            self.components[i].pending_active = true;
        }
    }

    pub fn confirm_active(&mut self) {
        for c in self.components.iter_mut() {
            c.active |= c.pending_active;
        }
    }

    pub fn set_all_active(&mut self, active: bool) {
        for c in self.components.iter_mut().filter(|c| !c.is_junction()) {
            c.active = active;
            c.pending_active = active;
        }
    }

    /// Zero every output of a component.
    pub fn clear_outputs(&mut self, id: ComponentId) -> Result<(), SimError> {
        let ids: Vec<LinkId> = self.component(id)?.links.values().copied().collect();
        for l in ids {
            let link = &mut self.links[l.0];
            if link.direction == Direction::Output {
                link.value = 0;
            }
        }
        Ok(())
    }
}

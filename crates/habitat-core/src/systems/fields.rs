//! Resource Field Systems
//!
//! Advances field depletion/regeneration each tick and lets foragers draw
//! from the nearest field that carries what they need.

use bevy_ecs::prelude::*;

use habitat_events::{EventKind, SimEvent};

use crate::components::agent::{AgentId, Forager, Position, ResourceIntake};
use crate::components::field::ResourceFieldSet;
use crate::systems::tick::{SimClock, TickEvents};

/// System: apply depletion and regeneration to every field
pub fn update_resource_fields(
    clock: Res<SimClock>,
    mut fields: ResMut<ResourceFieldSet>,
    mut events: ResMut<TickEvents>,
) {
    for field_id in fields.update_all(clock.dt, clock.now()) {
        tracing::info!("Field {} depleted at {}", field_id, clock.time);
        events.push(SimEvent::new(clock.time, EventKind::FieldDepleted { field_id }));
    }
}

/// System: each forager consumes `demand_per_second * dt` from its nearest
/// matching field, in agent id order.
pub fn forage_nearest_fields(
    clock: Res<SimClock>,
    mut fields: ResMut<ResourceFieldSet>,
    mut events: ResMut<TickEvents>,
    mut query: Query<(&AgentId, &Position, &Forager, &mut ResourceIntake)>,
) {
    let mut foragers: Vec<(AgentId, Position, &Forager, Mut<ResourceIntake>)> = query
        .iter_mut()
        .map(|(id, position, forager, intake)| (*id, *position, forager, intake))
        .collect();
    foragers.sort_by_key(|(id, _, _, _)| *id);

    let now = clock.now();
    for (id, position, forager, intake) in foragers.iter_mut() {
        let demand = (forager.demand_per_second * clock.dt).max(0.0);
        let consumption = fields.consume_nearest(
            position.x,
            position.y,
            forager.resource_type.as_deref(),
            demand,
            now,
        );

        let Some(consumption) = consumption else {
            intake.record(None, 0.0);
            continue;
        };

        intake.record(Some(&consumption.field_id), consumption.amount);
        if consumption.amount <= 0.0 {
            continue;
        }

        events.push(SimEvent::new(
            clock.time,
            EventKind::ResourceConsumed {
                agent: id.0,
                field_id: consumption.field_id.clone(),
                resource_type: consumption.resource_type.clone(),
                amount: consumption.amount,
            },
        ));

        // The nearest search skips depleted fields, so this is a transition
        if fields
            .get(&consumption.field_id)
            .is_some_and(|field| field.is_depleted())
        {
            tracing::info!("Field {} exhausted by {}", consumption.field_id, id);
            events.push(SimEvent::new(
                clock.time,
                EventKind::FieldDepleted {
                    field_id: consumption.field_id,
                },
            ));
        }
    }
}

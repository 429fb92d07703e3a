use crate::railway::convoy::ConvoyParams;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverAction {
    Accel,
    Brake,
    Coast,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DistanceVelocity {
    pub dx: u32,
    pub v: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DriverPlan {
    pub action: DriverAction,
    pub step: DistanceVelocity,
}

/// Steps covered while braking from `speed` to a stand, losing `brake`
/// steps per tick each tick.
pub fn braking_steps(speed: u32, brake: u32) -> u32 {
    let brake = brake.max(1);
    let mut v = speed;
    let mut dx = 0;
    while v > brake {
        v -= brake;
        dx += v;
    }
    dx
}

/// Picks the speed for the next tick: as fast as the convoy may go while
/// still being able to stop within `dist` steps.
pub fn dynamic_plan_step(train: &ConvoyParams, current_velocity: u32, max_velocity: u32, dist: u32) -> DriverPlan {
    let mut v = (current_velocity + train.accel.max(1)).min(max_velocity);
    while v > 0 && v + braking_steps(v, train.brake) > dist {
        v -= 1;
    }
    // braking is limited, but never past the end of authority
    v = v.max(current_velocity.saturating_sub(train.brake.max(1))).min(dist);

    let action = if v > current_velocity {
        DriverAction::Accel
    } else if v < current_velocity {
        DriverAction::Brake
    } else {
        DriverAction::Coast
    };
    DriverPlan { action, step: DistanceVelocity { dx: v, v } }
}

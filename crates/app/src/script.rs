use flythrough_core::{EventScheduler, FiringPolicy, PathCurve, RenderGraph, Result, Sprite};
use glam::Vec3;

const GREETING_AT: f64 = 0.08;
const GREETING_OFFSET: f32 = 4.0;
const ENDING_AT: f64 = 0.975;
const ENDING_WIDTH: f32 = 5.0;
const ENDING_ASPECT: f32 = 275.0 / 500.0;
const DRIFT_START: f64 = 0.90;
const DRIFT_END: f64 = 0.97;
const DRIFT_HEIGHT: f32 = 2.0;

/// Builds the fixed event table of the demo.
pub fn demo_schedule(
    curve: &PathCurve,
    policy: FiringPolicy,
) -> Result<EventScheduler<RenderGraph>> {
    let mut scheduler = EventScheduler::new(policy);

    let greeting = curve.point_at(GREETING_AT) + Vec3::X * GREETING_OFFSET;
    scheduler.add_event("greeting", 8.0, move |graph: &mut RenderGraph| {
        graph.scene_mut().show_text("Hello World", greeting);
    })?;

    let resting = curve.point_at(ENDING_AT);
    scheduler.add_event("ending-sprite", 90.0, move |graph: &mut RenderGraph| {
        graph.scene_mut().place_sprite(Sprite {
            name: "ending".to_string(),
            position: resting + Vec3::Y * DRIFT_HEIGHT,
            scale: [ENDING_WIDTH, ENDING_WIDTH * ENDING_ASPECT],
            visible: true,
        });
    })?;

    // The sprite sinks onto its resting point while the camera approaches.
    scheduler.add_range(
        "ending-drift",
        DRIFT_START,
        DRIFT_END,
        move |graph: &mut RenderGraph, progress| {
            let remaining = ((DRIFT_END - progress) / (DRIFT_END - DRIFT_START)) as f32;
            graph.scene_mut().move_sprite(resting + Vec3::Y * DRIFT_HEIGHT * remaining);
        },
    )?;

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flythrough_core::AppConfig;

    #[test]
    fn demo_script_places_text_and_settles_the_sprite() {
        let curve = AppConfig::default().build_curve().unwrap();
        let mut scheduler = demo_schedule(&curve, FiringPolicy::Crossing).unwrap();
        let mut graph = RenderGraph::new();

        for step in 0..=100 {
            scheduler.poll(step as f64 / 100.0, &mut graph);
        }

        let scene = graph.scene();
        assert_eq!(scene.panels.len(), 1);
        assert_eq!(scene.panels[0].text, "Hello World");

        let sprite = scene.sprite.as_ref().expect("sprite placed at 90%");
        assert!(sprite.position.distance(curve.point_at(ENDING_AT)) < 1e-4);
        assert!(scheduler.pending().is_empty());
    }
}

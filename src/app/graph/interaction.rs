use eframe::egui::{self, Pos2, Rect, Ui};

use crate::controller::Intent;

use super::super::ViewModel;
use super::super::render_utils::{circle_visible, screen_to_world};

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.1, 4.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let primary_on_background =
            self.dragging.is_none() && response.dragged_by(egui::PointerButton::Primary);
        if primary_on_background
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    pub(in crate::app) fn handle_node_drag(
        &mut self,
        rect: Rect,
        response: &egui::Response,
        hovered_id: Option<&str>,
    ) {
        if response.drag_started_by(egui::PointerButton::Primary) {
            self.dragging = hovered_id.map(str::to_owned);
        }

        if let Some(node_id) = &self.dragging
            && response.dragged_by(egui::PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
        {
            self.intents.push(Intent::Pin {
                node_id: node_id.clone(),
                position: screen_to_world(rect, self.pan, self.zoom, pointer),
            });
        }

        if response.drag_stopped()
            && let Some(node_id) = self.dragging.take()
        {
            self.intents.push(Intent::Release { node_id });
        }
    }

    pub(in crate::app) fn visible_indices(
        &self,
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        drawable: &[bool],
    ) -> Vec<usize> {
        (0..screen_positions.len())
            .filter(|&index| {
                drawable[index]
                    && circle_visible(rect, screen_positions[index], screen_radii[index])
            })
            .collect()
    }

    pub(in crate::app) fn hovered_index(
        &self,
        ui: &Ui,
        visible_indices: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<(usize, f32)> {
        let pointer_pos = ui.input(|input| input.pointer.hover_pos());
        pointer_pos.and_then(|pointer| {
            visible_indices
                .iter()
                .filter_map(|index| {
                    let distance = screen_positions[*index].distance(pointer);
                    if distance <= screen_radii[*index] {
                        Some((*index, distance))
                    } else {
                        None
                    }
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
        })
    }
}

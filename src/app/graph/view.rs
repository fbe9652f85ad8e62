use eframe::egui::{self, Align2, Color32, FontId, Sense, Shape, Stroke, Ui, vec2};

use crate::controller::Controller;
use crate::layout::{Glyph, LinkStyle};

use super::super::ViewModel;
use super::super::render_utils::{
    blend_color, dim_color, draw_background, edge_visible, glyph_color, hexagon, node_radius,
    world_to_screen,
};

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui, controller: &Controller) {
        let layout = controller.layout();
        let Some(simulation) = layout.simulation() else {
            ui.label("Waiting for the first roadmap snapshot.");
            return;
        };

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.pan, self.zoom);
        self.handle_graph_zoom(ui, rect, &response);

        let nodes = simulation.nodes();
        let classes = nodes
            .iter()
            .map(|sim_node| layout.visual(sim_node.id()).map(|visual| visual.class))
            .collect::<Vec<_>>();
        let drawable = classes
            .iter()
            .map(|class| class.is_some_and(|class| class.glyph != Glyph::Undiscovered))
            .collect::<Vec<_>>();
        let screen_positions = nodes
            .iter()
            .map(|sim_node| world_to_screen(rect, self.pan, self.zoom, sim_node.body.position))
            .collect::<Vec<_>>();
        let screen_radii = classes
            .iter()
            .map(|class| class.map_or(0.0, |class| node_radius(class, self.zoom)))
            .collect::<Vec<_>>();

        let visible = self.visible_indices(rect, &screen_positions, &screen_radii, &drawable);
        let hovered = self.hovered_index(ui, &visible, &screen_positions, &screen_radii);
        let hovered_id = hovered.map(|(index, _)| nodes[index].id());

        self.handle_node_drag(rect, &response, hovered_id);
        self.handle_graph_pan(&response);

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let zoom_sqrt = self.zoom.sqrt();
        for link in simulation.links() {
            if !drawable[link.source] || !drawable[link.target] {
                continue;
            }
            let start = screen_positions[link.source];
            let end = screen_positions[link.target];
            if !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let touches_selection = self.selected.as_deref().is_some_and(|selected| {
                nodes[link.source].id() == selected || nodes[link.target].id() == selected
            });
            let color = if touches_selection {
                Color32::from_rgb(241, 146, 94)
            } else {
                Color32::from_rgba_unmultiplied(150, 158, 170, 190)
            };
            let stroke = Stroke::new((1.4 * zoom_sqrt).clamp(0.6, 3.4), color);

            match layout.visuals().link(&link.key).unwrap_or(LinkStyle::Dashed) {
                LinkStyle::Solid => {
                    painter.line_segment([start, end], stroke);
                }
                LinkStyle::Dashed => {
                    painter.extend(Shape::dashed_line(
                        &[start, end],
                        stroke,
                        6.0 * zoom_sqrt,
                        5.0 * zoom_sqrt,
                    ));
                }
            }
        }

        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;
        for &index in &visible {
            let sim_node = &nodes[index];
            let Some(visual) = layout.visual(sim_node.id()) else {
                continue;
            };
            let position = screen_positions[index];
            let radius = screen_radii[index];
            let is_hovered = hovered_id == Some(sim_node.id());
            let is_selected = self.selected.as_deref() == Some(sim_node.id());

            let base_color = glyph_color(visual.class.glyph);
            let unselected_color = if visual.class.locked {
                dim_color(base_color, 0.45)
            } else if is_hovered {
                blend_color(base_color, Color32::from_rgb(255, 164, 101), 0.55)
            } else {
                base_color
            };
            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", sim_node.id())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            let color = blend_color(unselected_color, selected_color, selection_mix);
            let outline = Stroke::new(
                1.0 + (selection_mix * 1.2),
                Color32::from_rgba_unmultiplied(15, 15, 15, 190),
            );

            if visual.class.is_major() {
                painter.add(Shape::convex_polygon(hexagon(position, radius), color, outline));
            } else {
                painter.circle_filled(position, radius, color);
                painter.circle_stroke(position, radius, outline);
            }

            if selection_mix > 0.0 {
                let halo_alpha = (30.0 + (selection_mix * 145.0)) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(1.6, Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha)),
                );
            }

            if let Some(percent) = &visual.percent
                && radius > 9.0
            {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    percent,
                    FontId::proportional((radius * 0.7).clamp(8.0, 14.0)),
                    Color32::from_gray(20),
                );
            }

            let should_draw_label =
                is_selected || is_hovered || visual.class.is_major() || self.zoom > 0.9;
            if should_draw_label && !visual.label.is_empty() {
                painter.text(
                    position + vec2(0.0, radius + 4.0),
                    Align2::CENTER_TOP,
                    visual.label.as_str(),
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some((index, _)) = hovered
            && let Some(visual) = layout.visual(nodes[index].id())
        {
            let mut panel_text = visual.label.clone();
            if let Some(percent) = &visual.percent {
                panel_text.push_str(&format!("  |  {percent}"));
            }
            if visual.class.locked {
                panel_text.push_str("  |  locked");
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            let selected = hovered_id.map(str::to_owned);
            self.set_selected(selected);
        }
    }

    pub(in crate::app) fn focus_node(&mut self, controller: &Controller, node_id: &str) {
        if let Some(sim_node) = controller.layout().simulation().and_then(|sim| sim.node(node_id)) {
            self.pan = -(sim_node.body.position * self.zoom);
        }
        self.set_selected(Some(node_id.to_owned()));
    }
}

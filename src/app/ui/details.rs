use eframe::egui::{self, Color32, RichText, Ui};

use crate::controller::{Controller, Intent};
use crate::roadmap::{NodeType, is_unlocked, percent_label};

use super::super::{NotesDraft, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, controller: &Controller) {
        let state = controller.state();
        let (Some(snapshot), Some(view)) = (&state.snapshot, &state.view) else {
            return;
        };
        let Some(selected_id) = self.selected.clone() else {
            return;
        };

        ui.horizontal(|ui| {
            ui.heading("Topic");
            if ui.small_button("Close").clicked() {
                self.set_selected(None);
            }
        });
        ui.add_space(6.0);

        let Some(node) = snapshot.node(&selected_id) else {
            ui.label("This topic is no longer part of the roadmap.");
            return;
        };
        if !view.discovered.contains(&node.id) {
            ui.label("You have not discovered this topic yet.");
            return;
        }

        let start_id = &controller.rules().start_id;
        let unlocked = is_unlocked(&snapshot.unlocked, &node.id, start_id);
        let kind = match node.kind {
            NodeType::Start => "start",
            NodeType::Main => "topic",
            NodeType::Sub => "lesson",
        };

        ui.label(RichText::new(node.title.as_str()).strong());
        ui.small(format!("{kind} · {}", node.id));
        if let Some(percent) = percent_label(node, &view.discovered) {
            ui.label(format!("Progress: {percent}"));
        } else if let Some(percent) = node.percent {
            ui.label(format!("Progress: {percent}%"));
        }
        if !unlocked {
            ui.colored_label(
                Color32::from_rgb(241, 146, 94),
                "Locked: finish its prerequisites first.",
            );
        }
        if !node.prerequisites.is_empty() {
            let names = node
                .prerequisites
                .iter()
                .map(|id| snapshot.node(id).map_or(id.as_str(), |node| node.title.as_str()))
                .collect::<Vec<_>>();
            ui.label(format!("Requires: {}", names.join(", ")));
        }

        if !node.description.is_empty() {
            ui.separator();
            ui.label(node.description.as_str());
        }
        if let Some(link) = node.pdf_link.as_deref().filter(|link| !link.is_empty()) {
            ui.hyperlink_to("Open course material", link);
        }

        if !node.exercises.is_empty() {
            ui.separator();
            ui.label(RichText::new("Exercises").strong());
            for exercise in &node.exercises {
                let mut checked = state
                    .exercise_checked(&exercise.id)
                    .unwrap_or(exercise.completed);
                let in_flight = state.is_toggle_in_flight(&exercise.id);
                let mut label = format!("{} ({} XP)", exercise.label, exercise.points);
                if exercise.optional {
                    label.push_str(" (optional)");
                }

                let response = ui.add_enabled(
                    unlocked && !in_flight,
                    egui::Checkbox::new(&mut checked, label),
                );
                if response.changed() {
                    self.intents.push(Intent::ToggleExercise {
                        exercise_id: exercise.id.clone(),
                        completed: checked,
                    });
                }
            }
        }

        ui.separator();
        ui.label(RichText::new("Notes").strong());
        if self
            .notes
            .as_ref()
            .is_none_or(|draft| draft.node_id != node.id)
        {
            self.notes = Some(NotesDraft {
                node_id: node.id.clone(),
                text: node.user_notes.clone(),
            });
        }
        let Some(draft) = self.notes.as_mut() else {
            return;
        };
        ui.add(
            egui::TextEdit::multiline(&mut draft.text)
                .desired_rows(6)
                .desired_width(f32::INFINITY),
        );
        let dirty = draft.text != node.user_notes;
        ui.horizontal(|ui| {
            if ui.add_enabled(dirty, egui::Button::new("Save notes")).clicked() {
                self.intents.push(Intent::SaveNotes {
                    node_id: draft.node_id.clone(),
                    notes: draft.text.clone(),
                });
            }
            if ui.add_enabled(dirty, egui::Button::new("Revert")).clicked() {
                draft.text = node.user_notes.clone();
            }
        });
    }
}

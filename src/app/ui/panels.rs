use eframe::egui::{self, Align, Color32, Context, Layout, ProgressBar, RichText, Ui};

use crate::controller::{Controller, Intent};
use crate::roadmap::{DerivedView, Snapshot, Visibility, search_nodes, visibility};
use crate::util::plural;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context, controller: &Controller, source: &str) {
        let state = controller.state();
        let (Some(snapshot), Some(view)) = (&state.snapshot, &state.view) else {
            return;
        };

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("skill-roadmap");
                    ui.separator();
                    ui.label(format!("roadmap: {}", controller.roadmap()));
                    ui.label(format!("source: {source}"));
                    ui.separator();
                    ui.add(
                        egui::TextEdit::singleline(&mut self.roadmap_input)
                            .hint_text("roadmap")
                            .desired_width(120.0),
                    );
                    let target = self.roadmap_input.trim();
                    let can_switch = !target.is_empty() && target != controller.roadmap();
                    if ui.add_enabled(can_switch, egui::Button::new("Open")).clicked() {
                        self.intents.push(Intent::SwitchRoadmap(target.to_owned()));
                    }
                    let refresh = ui.add_enabled(!state.loading, egui::Button::new("Refresh"));
                    if refresh.clicked() {
                        self.intents.push(Intent::Refresh);
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if state.loading {
                            ui.spinner();
                        }
                        ui.label(format!(
                            "{} nodes, {} discovered",
                            snapshot.nodes.len(),
                            view.discovered.len()
                        ));
                    });
                });
            });

        if let Some(status) = &state.status {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(Color32::from_rgb(241, 146, 94), status.as_str());
                    if ui.button("Dismiss").clicked() {
                        self.intents.push(Intent::DismissStatus);
                    }
                });
            });
        }

        egui::SidePanel::left("progress")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("progress_scroll")
                    .auto_shrink([false, false])
                    .show(ui, |ui| self.draw_sidebar(ui, controller, snapshot, view));
            });

        if self.selected.is_some() {
            egui::SidePanel::right("details")
                .resizable(true)
                .default_width(360.0)
                .show(ctx, |ui| self.draw_details(ui, controller));
        }

        egui::CentralPanel::default().show(ctx, |ui| self.draw_graph(ui, controller));

        self.draw_notification(ctx, controller);
    }

    fn draw_sidebar(
        &mut self,
        ui: &mut Ui,
        controller: &Controller,
        snapshot: &Snapshot,
        view: &DerivedView,
    ) {
        let progression = view.progression;
        ui.heading(format!("Level {}", progression.level));
        ui.add(
            ProgressBar::new(f32::from(progression.progress_percent()) / 100.0).text(format!(
                "{} / {} XP",
                progression.xp_into_level, progression.xp_for_level
            )),
        );
        ui.label(format!("Total experience: {} XP", progression.earned_xp));
        ui.label(format!("Streak: {}", plural(snapshot.streak.streak, "day")));

        ui.separator();
        ui.label(RichText::new("Topics").strong());
        if view.main_progress.is_empty() {
            ui.label("No topics in this roadmap yet.");
        }
        for main in &view.main_progress {
            ui.horizontal(|ui| {
                if ui.link(main.title.as_str()).clicked() {
                    self.focus_node(controller, &main.id);
                }
                ui.add(
                    ProgressBar::new(f32::from(main.percent) / 100.0)
                        .text(format!("{}%", main.percent)),
                );
            });
        }

        ui.separator();
        ui.label(RichText::new("CTFs").strong());
        for ctf in &snapshot.ctfs {
            ui.horizontal(|ui| {
                if ctf.link.is_empty() {
                    ui.label(ctf.title.as_str());
                } else {
                    ui.hyperlink_to(ctf.title.as_str(), ctf.link.as_str());
                }
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.small_button("+").clicked() {
                        self.intents.push(Intent::AdjustCtf {
                            ctf_id: ctf.id.clone(),
                            delta: 1,
                        });
                    }
                    ui.label(ctf.completed.to_string());
                    let minus = ui.add_enabled(ctf.completed > 0, egui::Button::new("-").small());
                    if minus.clicked() {
                        self.intents.push(Intent::AdjustCtf {
                            ctf_id: ctf.id.clone(),
                            delta: -1,
                        });
                    }
                });
            })
            .response
            .on_hover_text(ctf.description.as_str());
        }

        ui.separator();
        ui.label(RichText::new("Abilities").strong());
        egui::Grid::new("abilities_grid").striped(true).show(ui, |ui| {
            for ability in &view.abilities {
                ui.label(ability.category.as_str());
                ui.label(ability.score.to_string());
                ui.end_row();
            }
        });

        ui.separator();
        ui.label(RichText::new(format!("Badges ({})", snapshot.badges.len())).strong());
        if snapshot.badges.is_empty() {
            ui.label("Complete exercises and CTFs to earn badges.");
        }
        for badge in &snapshot.badges {
            ui.label(format!("🏅 {}", badge.title))
                .on_hover_text(badge.description.as_str());
        }

        ui.separator();
        ui.label(RichText::new("Roadmap").strong());
        ui.add(egui::TextEdit::singleline(&mut self.search).hint_text("Search discovered topics"));
        if self.search.trim().is_empty() {
            self.draw_forest(ui, controller, snapshot, view);
        } else {
            let matches = search_nodes(&snapshot.nodes, &view.discovered, &self.search);
            if matches.is_empty() {
                ui.label("No discovered topic matches.");
            }
            for id in matches {
                let title = snapshot.node(id).map_or(id, |node| node.title.as_str());
                if ui.link(title).clicked() {
                    self.focus_node(controller, id);
                }
            }
        }
    }

    fn draw_forest(
        &mut self,
        ui: &mut Ui,
        controller: &Controller,
        snapshot: &Snapshot,
        view: &DerivedView,
    ) {
        let roots = view.forest.roots().map(|entry| entry.id.clone()).collect::<Vec<_>>();
        for id in roots {
            self.draw_forest_entry(ui, controller, snapshot, view, &id);
        }
    }

    fn draw_forest_entry(
        &mut self,
        ui: &mut Ui,
        controller: &Controller,
        snapshot: &Snapshot,
        view: &DerivedView,
        id: &str,
    ) {
        let start_id = &controller.rules().start_id;
        let Some(entry) = view.forest.get(id) else {
            return;
        };
        let title = match visibility(&snapshot.unlocked, &view.discovered, id, start_id) {
            Visibility::Hidden => return,
            Visibility::Silhouette => format!("🔒 {}", entry.title),
            Visibility::Unlocked => match snapshot.node(id).and_then(|node| node.percent) {
                Some(percent) => format!("{} ({percent}%)", entry.title),
                None => entry.title.clone(),
            },
        };

        let children = view
            .forest
            .children(id)
            .into_iter()
            .map(|child| child.id.clone())
            .collect::<Vec<_>>();
        if children.is_empty() {
            if ui.link(title).clicked() {
                self.focus_node(controller, id);
            }
            return;
        }

        let header = egui::CollapsingHeader::new(title)
            .id_salt(("forest", id))
            .default_open(entry.kind.is_major())
            .show(ui, |ui| {
                for child in &children {
                    self.draw_forest_entry(ui, controller, snapshot, view, child);
                }
            });
        if header.header_response.double_clicked() {
            self.focus_node(controller, id);
        }
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Context, Vec2};

use crate::client::{RoadmapBackend, Worker};
use crate::config::EngineConfig;
use crate::controller::{Controller, Intent};
use crate::roadmap::AppState;

mod graph;
mod render_utils;
mod ui;

const BUSY_REPAINT: Duration = Duration::from_millis(50);

pub struct RoadmapApp {
    source: String,
    controller: Controller,
    worker: Worker,
    view: ViewModel,
}

enum Screen {
    Loading,
    Ready,
    Error(String),
}

impl Screen {
    fn of(state: &AppState) -> Self {
        if state.is_ready() {
            return Self::Ready;
        }
        match &state.status {
            Some(message) if !state.loading => Self::Error(message.clone()),
            _ => Self::Loading,
        }
    }
}

struct NotesDraft {
    node_id: String,
    text: String,
}

struct ViewModel {
    pan: Vec2,
    zoom: f32,
    selected: Option<String>,
    search: String,
    roadmap_input: String,
    dragging: Option<String>,
    notes: Option<NotesDraft>,
    intents: Vec<Intent>,
}

impl RoadmapApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: EngineConfig,
        roadmap: String,
        backend: Arc<dyn RoadmapBackend>,
        source: String,
    ) -> Self {
        let mut app = Self {
            source,
            view: ViewModel::new(&roadmap),
            controller: Controller::new(config, roadmap),
            worker: Worker::new(backend),
        };
        app.controller.dispatch(Intent::Refresh);
        app.flush_requests();
        app
    }

    fn flush_requests(&mut self) {
        for request in self.controller.drain_requests() {
            self.worker.submit(request);
        }
    }
}

impl ViewModel {
    fn new(roadmap: &str) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 0.8,
            selected: None,
            search: String::new(),
            roadmap_input: roadmap.to_owned(),
            dragging: None,
            notes: None,
            intents: Vec::new(),
        }
    }

    fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        self.notes = None;
    }
}

impl eframe::App for RoadmapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        for response in self.worker.poll() {
            self.controller.handle(response, now);
        }

        match Screen::of(self.controller.state()) {
            Screen::Loading => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading roadmap {}...", self.controller.roadmap()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            Screen::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the roadmap");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        self.view.intents.push(Intent::DismissStatus);
                        self.view.intents.push(Intent::Refresh);
                    }
                });
            }
            Screen::Ready => self.view.show(ctx, &self.controller, &self.source),
        }

        for intent in std::mem::take(&mut self.view.intents) {
            if matches!(intent, Intent::SwitchRoadmap(_)) {
                self.view.set_selected(None);
                self.view.pan = Vec2::ZERO;
            }
            self.controller.dispatch(intent);
        }
        self.flush_requests();

        if self.controller.tick(now) {
            ctx.request_repaint();
        } else if !self.worker.is_idle() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}

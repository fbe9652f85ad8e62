mod details;
mod notice;
mod panels;

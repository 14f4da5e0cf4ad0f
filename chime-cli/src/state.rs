use anyhow::{Context, Result};
use chrono::{Duration, Local};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use chime_core::{Category, Course, Task};

pub fn chime_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".chime"))
}

pub fn ensure_chime_home() -> Result<PathBuf> {
    let dir = chime_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn tasks_path() -> Result<PathBuf> {
    Ok(ensure_chime_home()?.join("tasks.json"))
}

pub fn courses_path() -> Result<PathBuf> {
    Ok(ensure_chime_home()?.join("courses.json"))
}

/// A missing snapshot reads as empty; a corrupt one is the caller's error.
fn read_snapshot<T: DeserializeOwned>(p: &Path) -> Result<Vec<T>> {
    if !p.exists() {
        return Ok(vec![]);
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn read_tasks() -> Result<Vec<Task>> {
    read_snapshot(&tasks_path()?)
}

pub fn read_courses() -> Result<Vec<Course>> {
    read_snapshot(&courses_path()?)
}

pub fn seed_samples() -> Result<()> {
    let dir = ensure_chime_home()?;
    seed_samples_in(&dir)
}

/// Write starter snapshots for files that do not exist yet, so a fresh
/// install has something to watch. Existing files are left untouched.
fn seed_samples_in(dir: &Path) -> Result<()> {
    let tp = dir.join("tasks.json");
    if tp.exists() {
        println!("Tasks snapshot already exists: {}", tp.display());
    } else {
        let due = Local::now().naive_local() + Duration::days(1);
        let tasks = vec![
            Task::new("sample-essay", "Finish the essay draft", Category::Homework)
                .with_deadline(due),
        ];
        let json = serde_json::to_string_pretty(&tasks)?;
        fs::write(&tp, json).with_context(|| format!("write {}", tp.display()))?;
        println!("Wrote {}", tp.display());
    }

    let cp = dir.join("courses.json");
    if cp.exists() {
        println!("Courses snapshot already exists: {}", cp.display());
    } else {
        let courses = vec![
            Course::new("sample-databases", "Databases", 3, "09:30").with_location("B12"),
        ];
        let json = serde_json::to_string_pretty(&courses)?;
        fs::write(&cp, json).with_context(|| format!("write {}", cp.display()))?;
        println!("Wrote {}", cp.display());
    }

    Ok(())
}

// Benchmark for day layouts
// Measures column assignment and rendering for growing days

use chrono::NaiveDate;
use conference_timetable::models::entry::{DayEntries, EntryType, ScheduleEntry, TimetableData};
use conference_timetable::models::view::{DetailLevel, LayoutKind};
use conference_timetable::services::layout::{CompactLayout, LayoutOptions, LayoutStrategy, ProportionalLayout};
use conference_timetable::services::timetable::TimetableDrawer;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const DAY: &str = "20240513";

/// `count` talks spread over 08:00-18:00 with some parallel tracks
fn busy_day(count: usize) -> DayEntries {
    let date = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
    (0..count)
        .map(|i| {
            let minute = 8 * 60 + (i * 35 % 600) as u32;
            let start = date.and_hms_opt(minute / 60, minute % 60, 0).unwrap();
            let duration = 15 + (i % 4) as i64 * 15;
            let mut entry =
                ScheduleEntry::new(format!("e{}", i), EntryType::Contribution, format!("Talk {}", i), start, duration)
                    .unwrap();
            entry.room = Some(format!("Room {}", i % 3));
            (entry.id.clone(), entry)
        })
        .collect()
}

fn bench_draw_day(c: &mut Criterion) {
    let options = LayoutOptions::default();
    let mut group = c.benchmark_group("draw_day");

    for count in [10, 50, 200] {
        let day = busy_day(count);
        group.bench_with_input(BenchmarkId::new("compact", count), &day, |b, day| {
            b.iter(|| CompactLayout.draw_day(black_box(day), &options));
        });
        group.bench_with_input(BenchmarkId::new("proportional", count), &day, |b, day| {
            b.iter(|| ProportionalLayout.draw_day(black_box(day), &options));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_day");

    for count in [10, 50, 200] {
        let mut data = TimetableData::new();
        data.insert(DAY.to_string(), busy_day(count));
        let drawer = TimetableDrawer::new(data, LayoutOptions::default(), LayoutKind::Room, DetailLevel::Session, 1200.0);

        group.bench_with_input(BenchmarkId::from_parameter(count), &drawer, |b, drawer| {
            b.iter(|| drawer.render_day(black_box(DAY)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_draw_day, bench_render);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use hookwright::context::document::{same_content, splice};
use hookwright::context::{ProjectContext, Record, SectionData};
use hookwright::hooks::protect::{content_violations, safety_level};

fn synthetic_document(paragraphs: usize) -> String {
    let mut doc = String::from("# Project\n\n");
    for i in 0..paragraphs {
        doc.push_str(&format!(
            "Paragraph {i} with a <!-- comment --> and some prose about module_{i}.\n\n"
        ));
    }
    doc.push_str("<!-- DYNAMIC_CONTENT_START -->\nstale\n<!-- DYNAMIC_CONTENT_END -->\n\n## Notes\n");
    doc
}

fn synthetic_sections(count: usize) -> Vec<SectionData> {
    (0..count)
        .map(|i| {
            let body = (0..20)
                .map(|line| format!("- item {line} of section {i}"))
                .collect::<Vec<_>>()
                .join("\n");
            SectionData::new(
                &format!("section_{i}"),
                &format!("Section {i}"),
                format!("## Section {i}\n\n{body}"),
                i as i32,
            )
        })
        .collect()
}

fn synthetic_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            json!({
                "language": "typescript",
                "framework": [format!("framework_{i}")],
                "services": ["postgres", "redis"],
                "commands": {format!("script_{i}"): "next dev"},
                "health_status": {"git": "✅ Repository accessible"},
                "extra": i,
            })
            .as_object()
            .cloned()
            .unwrap_or_default()
        })
        .collect()
}

fn bench_perf_core(c: &mut Criterion) {
    let document = synthetic_document(400);
    let sections = synthetic_sections(8);
    let spliced = splice(&document, &sections, "2025-01-01T00:00:00.000000");
    c.bench_function("splice_8_sections_into_large_document", |b| {
        b.iter(|| {
            black_box(splice(
                black_box(&document),
                black_box(&sections),
                "2025-01-01T00:00:00.000000",
            ))
        })
    });

    let respliced = splice(&spliced, &sections, "2025-01-01T00:05:00.000000");
    c.bench_function("same_content_ignoring_generation_stamp", |b| {
        b.iter(|| black_box(same_content(black_box(&spliced), black_box(&respliced))))
    });

    let records = synthetic_records(64);
    c.bench_function("merge_64_plugin_records", |b| {
        b.iter(|| {
            let mut context = ProjectContext::default();
            for record in &records {
                context.merge(black_box(record));
            }
            black_box(context)
        })
    });

    let paths: Vec<String> = (0..500)
        .map(|i| match i % 5 {
            0 => format!("apps/web/app/route_{i}/page.tsx"),
            1 => format!("packages/ui/src/component_{i}.tsx"),
            2 => format!("apps/web/.env.local.{i}"),
            3 => "pnpm-lock.yaml".to_string(),
            _ => format!("config/service-token-{i}.json"),
        })
        .collect();
    c.bench_function("classify_500_edit_paths", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(safety_level(black_box(path)));
            }
        })
    });

    let source = "const apiKey = \"abc\";\n".repeat(200);
    c.bench_function("scan_content_for_secrets", |b| {
        b.iter(|| black_box(content_violations(black_box(&source))))
    });
}

criterion_group!(benches, bench_perf_core);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use wave_slurper::{
    chunk::{reassemble, ChunkPlan, Framing},
    lookup::CommType,
    sds::{self, decode_payload},
    tds, Calibrate, Capture, Channel,
};

const POINTS: usize = 1 << 16;
const CHUNK: usize = 5000;

fn benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    let mut dummy_payload = vec![0u8; POINTS * 2];
    rng.fill(&mut dummy_payload[..]);

    c.bench_function("sds 8 bit payload", |b| {
        b.iter(|| decode_payload(black_box(CommType::Byte), black_box(&dummy_payload[..POINTS])))
    });

    c.bench_function("sds 16 bit payload", |b| {
        b.iter(|| decode_payload(black_box(CommType::Word), black_box(&dummy_payload)))
    });

    // IEEE 488.2 block of 16 bit MSB-first signed codes
    let preamble = tds::Preamble::decode("2;16;BIN;RI;MSB;65536;x;Y;1e-6;0;0;s;1e-3;0;0;V").unwrap();
    let mut block = format!("#6{:06}", dummy_payload.len()).into_bytes();
    block.extend_from_slice(&dummy_payload);
    block.push(b'\n');
    c.bench_function("tds binary curve", |b| {
        b.iter(|| preamble.decode_curve(black_box(&block)))
    });

    let ascii = tds::Preamble::decode("1;8;ASC;RP;MSB;65536;x;Y;1e-6;0;0;s;0.04;0;0;V").unwrap();
    let mut list = b":CURVE ".to_vec();
    let codes: Vec<String> = dummy_payload[..POINTS].iter().map(u8::to_string).collect();
    list.extend_from_slice(codes.join(",").as_bytes());
    list.push(b'\n');
    c.bench_function("tds ascii curve", |b| {
        b.iter(|| ascii.decode_curve(black_box(&list)))
    });

    let calibration = sds::Calibration {
        codes_per_division: 25.0,
        volts_per_division: 0.5,
        volt_offset: 0.1,
        start: -5e-3,
        interval: 1e-6,
    };
    let samples = decode_payload(CommType::Word, &dummy_payload).unwrap();
    let capture = Capture::join(vec![Channel::new(samples, calibration)]).unwrap();
    c.bench_function("calibrated rows", |b| {
        b.iter(|| {
            capture
                .rows()
                .map(|row| row.time + row.voltages[0])
                .sum::<f64>()
        })
    });
    c.bench_function("channel voltages", |b| {
        b.iter(|| capture.channels()[0].voltages().sum::<f64>())
    });
    c.bench_function("voltage", |b| {
        b.iter(|| calibration.voltage(black_box(-1234)))
    });

    let plan = ChunkPlan::new(POINTS, CHUNK).unwrap();
    let framing = Framing::default();
    let transfers: Vec<Vec<u8>> = plan
        .chunks()
        .map(|c| framing.wrap(&dummy_payload[c.start * 2..(c.start + c.points) * 2]))
        .collect();
    c.bench_function("reassemble", |b| {
        b.iter(|| {
            reassemble(
                black_box(plan),
                framing,
                2,
                transfers.iter().map(Vec::as_slice),
            )
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);

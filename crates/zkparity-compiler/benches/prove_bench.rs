//! Benchmarks for the parity vote circuit: witness, proof and verification.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use zkparity_compiler::{compile_default, compute_witness, trusted_setup, NativeProver};

fn bench_witness(c: &mut Criterion) {
    let circuit = compile_default().unwrap();

    c.bench_function("parity_witness", |b| {
        b.iter(|| compute_witness(&circuit, black_box(173)).unwrap());
    });
}

fn bench_prove_and_verify(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let circuit = compile_default().unwrap();
    let key = trusted_setup(&circuit, &mut rng).unwrap();
    let components = key.verification_components();
    let prover = NativeProver::new(circuit, key).unwrap();

    c.bench_function("parity_groth16_prove", |b| {
        b.iter(|| prover.prove(black_box(173), &mut rng).unwrap());
    });

    let calldata = prover.prove(173, &mut rng).unwrap().to_calldata();
    c.bench_function("parity_pairing_check", |b| {
        b.iter(|| zkparity_verifier::verify(&components, black_box(&calldata)).unwrap());
    });
}

criterion_group!(benches, bench_witness, bench_prove_and_verify);
criterion_main!(benches);

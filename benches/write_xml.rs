use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use gridwrite::backend::XmlBackend;
use gridwrite::{
    write_to_backend, ArrayEncoding, DataObject, FieldArray, ImageData, IndexWidth, WriteOptions,
};

/// an `n^3` vertex image with a random scalar and a random vector on the points
fn image(n: usize) -> DataObject {
    let points = n * n * n;
    let fields: Array2<f64> = Array2::random((points, 4), Uniform::new(0., 10.));
    let pressure = fields.column(0).to_vec();
    let velocity = fields.slice(ndarray::s![.., 1..]).iter().copied().collect();

    let mut image = ImageData::new([n; 3], [0.; 3], [0.1; 3]);
    image.attributes.push_point(FieldArray::scalar("p", pressure));
    image
        .attributes
        .push_point(FieldArray::vector("u", 3, velocity));

    DataObject::from(image)
}

fn write_xml(input: &DataObject, encoding: ArrayEncoding) -> usize {
    let options = WriteOptions::default().with_encoding(encoding);
    let mut backend = XmlBackend::new(Vec::new(), encoding, IndexWidth::I64).unwrap();
    write_to_backend(input, &mut backend, &options).unwrap();
    backend.into_inner().len()
}

fn write_xml_bench(c: &mut Criterion) {
    let input = image(50);

    c.bench_function("write xml ascii 50", |b| {
        b.iter(|| write_xml(black_box(&input), ArrayEncoding::Ascii))
    });

    c.bench_function("write xml base64 50", |b| {
        b.iter(|| write_xml(black_box(&input), ArrayEncoding::Base64))
    });
}

criterion_group!(benches, write_xml_bench);
criterion_main!(benches);

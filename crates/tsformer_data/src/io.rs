//! NumPy file input.

use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::error::{DataError, Result};

fn open(path: &Path) -> Result<std::io::BufReader<std::fs::File>> {
    let file = std::fs::File::open(path)?;
    Ok(std::io::BufReader::new(file))
}

/// Read a 3-D series array from a `.npy` file.
///
/// `f32` arrays are read directly; `f64` arrays are converted.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a 3-D float array.
pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<Array3<f32>> {
    let path = path.as_ref();
    let arr = match Array3::<f32>::read_npy(open(path)?) {
        Ok(arr) => arr,
        Err(e) => {
            let arr: Array3<f64> = Array3::<f64>::read_npy(open(path)?).map_err(|_| {
                DataError::FormatError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            tracing::debug!("Converting f64 array from {} to f32", path.display());
            arr.mapv(|x| x as f32)
        }
    };
    tracing::info!("Loaded {:?} series from {}", arr.dim(), path.display());
    Ok(arr)
}

/// Read integer class labels from a `.npy` file.
///
/// Accepts 1-D `(N,)` or column `(N, 1)` arrays of `i64`, `i32`, `f64` or `f32`.
/// Float labels must be whole numbers.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds non-integral values.
pub fn read_labels_npy<P: AsRef<Path>>(path: P) -> Result<Vec<i64>> {
    let path = path.as_ref();

    if let Ok(arr) = Array1::<i64>::read_npy(open(path)?) {
        return Ok(arr.to_vec());
    }
    if let Ok(arr) = Array2::<i64>::read_npy(open(path)?) {
        return column(arr.shape(), path).map(|_| arr.iter().copied().collect());
    }
    if let Ok(arr) = Array1::<i32>::read_npy(open(path)?) {
        return Ok(arr.iter().map(|&v| i64::from(v)).collect());
    }
    if let Ok(arr) = Array2::<i32>::read_npy(open(path)?) {
        column(arr.shape(), path)?;
        return Ok(arr.iter().map(|&v| i64::from(v)).collect());
    }

    let floats: Vec<f64> = if let Ok(arr) = Array1::<f64>::read_npy(open(path)?) {
        arr.to_vec()
    } else if let Ok(arr) = Array2::<f64>::read_npy(open(path)?) {
        column(arr.shape(), path)?;
        arr.iter().copied().collect()
    } else if let Ok(arr) = Array1::<f32>::read_npy(open(path)?) {
        arr.iter().map(|&v| f64::from(v)).collect()
    } else {
        let arr = Array2::<f32>::read_npy(open(path)?).map_err(|e| {
            DataError::FormatError(format!("Failed to read labels {}: {}", path.display(), e))
        })?;
        column(arr.shape(), path)?;
        arr.iter().map(|&v| f64::from(v)).collect()
    };

    floats
        .into_iter()
        .map(|v| {
            if v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(DataError::FormatError(format!(
                    "label {} in {} is not an integer",
                    v,
                    path.display()
                )))
            }
        })
        .collect()
}

fn column(shape: &[usize], path: &Path) -> Result<()> {
    if shape.len() == 2 && shape[1] == 1 {
        Ok(())
    } else {
        Err(DataError::InvalidShape(format!(
            "labels in {} must be (N,) or (N, 1), got {:?}",
            path.display(),
            shape
        )))
    }
}

/// Write a 3-D series array to a `.npy` file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_npy<P: AsRef<Path>>(path: P, x: &Array3<f32>) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    x.write_npy(std::io::BufWriter::new(file))
        .map_err(|e| DataError::FormatError(format!("Failed to write npy: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_npy_f64_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        let arr = Array3::<f64>::from_shape_fn((2, 3, 4), |(a, b, c)| (a + b + c) as f64);
        arr.write_npy(std::fs::File::create(&path).unwrap()).unwrap();

        let loaded = read_npy(&path).unwrap();
        assert_eq!(loaded.shape(), &[2, 3, 4]);
        assert_eq!(loaded[[1, 2, 3]], 6.0);
    }

    #[test]
    fn test_write_then_read_npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        let arr = Array3::<f32>::from_elem((1, 2, 2), 0.5);
        write_npy(&path, &arr).unwrap();
        assert_eq!(read_npy(&path).unwrap(), arr);
    }

    #[test]
    fn test_read_labels_shapes() {
        let dir = tempfile::tempdir().unwrap();

        let flat = dir.path().join("flat.npy");
        Array1::from(vec![3i64, 1, 2])
            .write_npy(std::fs::File::create(&flat).unwrap())
            .unwrap();
        assert_eq!(read_labels_npy(&flat).unwrap(), vec![3, 1, 2]);

        let col = dir.path().join("col.npy");
        Array2::from_shape_vec((2, 1), vec![1.0f64, 0.0])
            .unwrap()
            .write_npy(std::fs::File::create(&col).unwrap())
            .unwrap();
        assert_eq!(read_labels_npy(&col).unwrap(), vec![1, 0]);

        let frac = dir.path().join("frac.npy");
        Array1::from(vec![0.5f32])
            .write_npy(std::fs::File::create(&frac).unwrap())
            .unwrap();
        assert!(read_labels_npy(&frac).is_err());
    }
}
